use crate::codec::{decode, link_key};
use crate::config::Settings;
use crate::error::StoreError;
use crate::model::{LinkRecord, LinkTarget};
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;

/// A record found for a request, with the store key it lives under.
#[derive(Debug, Clone)]
pub struct ResolvedLink {
    pub key: String,
    pub record: LinkRecord,
    pub target: LinkTarget,
}

#[derive(Debug)]
pub enum Resolution {
    /// The root path with a configured home page.
    Home(String),
    NotFound,
    Found(ResolvedLink),
}

/// First path segment with surrounding separators removed.
pub fn candidate_slug(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_matches('/').split('/').next().unwrap_or_default()
}

pub struct SlugResolver {
    store: Arc<dyn KeyValueStore>,
    settings: Arc<Settings>,
}

impl SlugResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: Arc<Settings>) -> Self {
        Self { store, settings }
    }

    pub async fn resolve(&self, path: &str) -> Resolution {
        if path == "/" {
            if let Some(home_url) = &self.settings.home_url {
                return Resolution::Home(home_url.clone());
            }
        }

        let slug = candidate_slug(path);
        if slug.is_empty()
            || self.settings.reserved_slugs.contains(slug)
            || !self.settings.slug_pattern.is_match(slug)
        {
            tracing::debug!("Path {} does not name a link", path);
            return Resolution::NotFound;
        }

        match self.lookup(slug, Some(self.settings.link_cache_ttl)).await {
            Some(link) => Resolution::Found(link),
            None => Resolution::NotFound,
        }
    }

    /// Fetches a slug honouring the case policy, falling back to the verbatim
    /// slug for records stored under mixed case keys. Store failures are
    /// logged and read as a miss.
    pub async fn lookup(&self, slug: &str, cache_ttl: Option<Duration>) -> Option<ResolvedLink> {
        let (key, raw) = match self.locate(slug, cache_ttl).await {
            Ok(found) => found?,
            Err(err) => {
                tracing::error!("Reading link {} failed: {}", slug, err);
                return None;
            }
        };

        let mut link = self.decode(&key, &raw)?;
        if cache_ttl.is_some() && link.record.view_expire_seconds.is_some() {
            // timed records must see the latest firstHitAt
            let fresh = self.fetch(&key, None).await?;
            link = self.decode(&key, &fresh)?;
        }
        Some(link)
    }

    /// Raw value for `slug` with the key it was found under.
    pub async fn locate(
        &self,
        slug: &str,
        cache_ttl: Option<Duration>,
    ) -> Result<Option<(String, String)>, StoreError> {
        let primary = self.settings.lookup_slug(slug);

        let key = link_key(&primary);
        if let Some(raw) = self.store.get(&key, cache_ttl).await? {
            return Ok(Some((key, raw)));
        }
        if self.settings.case_sensitive || primary == slug {
            return Ok(None);
        }

        tracing::debug!("No link at {}, retrying verbatim slug {}", primary, slug);
        let key = link_key(slug);
        Ok(self.store.get(&key, cache_ttl).await?.map(|raw| (key, raw)))
    }

    async fn fetch(&self, key: &str, cache_ttl: Option<Duration>) -> Option<String> {
        match self.store.get(key, cache_ttl).await {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("Reading {} failed: {}", key, err);
                None
            }
        }
    }

    fn decode(&self, key: &str, raw: &str) -> Option<ResolvedLink> {
        match decode(raw) {
            Ok((record, target)) => Some(ResolvedLink {
                key: key.to_string(),
                record,
                target,
            }),
            Err(err) => {
                tracing::warn!("Ignoring undecodable record at {}: {}", key, err);
                None
            }
        }
    }
}
