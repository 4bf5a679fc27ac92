use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Text,
    #[serde(other)]
    Link,
}

/// Stored shape of a short link, kept at `link:<slug>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub hit_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_hit_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hits: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_expire_seconds: Option<i64>,
    /// Absolute TTL, epoch seconds, enforced by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Fields this service does not interpret, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LinkRecord {
    pub fn new(slug: impl Into<String>) -> Self {
        LinkRecord {
            slug: slug.into(),
            url: None,
            content: None,
            link_type: None,
            title: None,
            description: None,
            comment: None,
            hit_count: 0,
            first_hit_at: None,
            max_hits: None,
            view_expire_seconds: None,
            expiration: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Instant at which a self-destructing record stops being servable.
    pub fn view_expires_at(&self) -> Option<i64> {
        match (self.first_hit_at, self.view_expire_seconds) {
            (Some(first_hit_at), Some(window)) => Some(first_hit_at.saturating_add(window)),
            _ => None,
        }
    }
}

/// What a record resolves to once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Redirect { url: String },
    Text { content: String },
}

/// Store side metadata, readable without fetching the full value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub expiration: Option<i64>,
    pub url: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub link: LinkRecord,
    pub short_link: String,
}
