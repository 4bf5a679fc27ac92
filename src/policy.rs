use crate::model::LinkRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Servable,
    /// Hit limit reached.
    Exhausted,
    /// Self-destruct window elapsed.
    ViewExpired,
}

/// Runs on the record as stored, before anything is counted.
pub fn check_hit_limit(record: &LinkRecord) -> Verdict {
    match record.max_hits {
        Some(max_hits) if record.hit_count >= max_hits => Verdict::Exhausted,
        _ => Verdict::Servable,
    }
}

/// Runs on the record with this view applied.
pub fn check_view_expiry(record: &LinkRecord, now: i64) -> Verdict {
    match record.view_expires_at() {
        Some(expires_at) if now >= expires_at => Verdict::ViewExpired,
        _ => Verdict::Servable,
    }
}
