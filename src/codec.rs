//! Conversion between [`LinkRecord`] and the store's value representation.

use crate::error::CodecError;
use crate::model::{LinkMetadata, LinkRecord, LinkTarget, LinkType};

pub const LINK_KEY_PREFIX: &str = "link:";

pub fn link_key(slug: &str) -> String {
    format!("{LINK_KEY_PREFIX}{slug}")
}

pub fn encode(record: &LinkRecord) -> Result<String, CodecError> {
    Ok(serde_json::to_string(record)?)
}

/// Decodes a stored value and classifies it. Records that are neither text
/// nor carry a destination cannot be served and are rejected here.
pub fn decode(raw: &str) -> Result<(LinkRecord, LinkTarget), CodecError> {
    let record = decode_record(raw)?;
    let target = classify(&record)?;
    Ok((record, target))
}

/// Parses a stored value without requiring it to be servable.
pub fn decode_record(raw: &str) -> Result<LinkRecord, CodecError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn classify(record: &LinkRecord) -> Result<LinkTarget, CodecError> {
    let url = non_empty(record.url.as_deref());
    let content = non_empty(record.content.as_deref());

    if record.link_type == Some(LinkType::Text) || (content.is_some() && url.is_none()) {
        return Ok(LinkTarget::Text {
            content: content.unwrap_or_default().to_string(),
        });
    }
    match url {
        Some(url) => Ok(LinkTarget::Redirect {
            url: url.to_string(),
        }),
        None => Err(CodecError::MissingTarget(record.slug.clone())),
    }
}

pub fn metadata(record: &LinkRecord, expiration: Option<i64>) -> LinkMetadata {
    LinkMetadata {
        expiration,
        url: record.url.clone(),
        comment: record.comment.clone(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
