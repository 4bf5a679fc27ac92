use crate::codec::decode_record;
use crate::config::Settings;
use crate::error::AppError;
use crate::hits::write_record;
use crate::model::LinkRecord;
use crate::resolver::SlugResolver;
use crate::store::KeyValueStore;

pub const PREVIEW_TTL_SECS: i64 = 24 * 60 * 60;

/// Store-level expiration for a record being written. Preview deployments
/// never keep data for longer than a day.
pub fn compute_expiration(expiration: Option<i64>, now: i64, preview_mode: bool) -> Option<i64> {
    if !preview_mode {
        return expiration;
    }
    let preview_expiration = now + PREVIEW_TTL_SECS;
    match expiration {
        Some(expiration) if expiration <= preview_expiration => Some(expiration),
        _ => Some(preview_expiration),
    }
}

/// Zeroes view state for `slug`. `Ok(None)` when there is nothing to reset,
/// including an empty slug. Any stored record is reset, servable or not.
pub async fn reset_link(
    store: &dyn KeyValueStore,
    resolver: &SlugResolver,
    settings: &Settings,
    slug: &str,
    now: i64,
) -> Result<Option<LinkRecord>, AppError> {
    if settings.preview_mode {
        return Err(AppError::Forbidden("Preview mode cannot reset links.".into()));
    }
    if slug.is_empty() {
        return Ok(None);
    }
    let Some((key, raw)) = resolver.locate(slug, None).await? else {
        tracing::debug!("Nothing to reset for {}", slug);
        return Ok(None);
    };
    let record = decode_record(&raw)?;

    let expiration = compute_expiration(record.expiration, now, settings.preview_mode);
    let updated = LinkRecord {
        hit_count: 0,
        first_hit_at: None,
        updated_at: Some(now),
        expiration,
        ..record
    };
    write_record(store, &key, &updated, expiration).await?;
    tracing::info!("Reset hit state of {}", key);
    Ok(Some(updated))
}
