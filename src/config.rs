use crate::error::ConfigError;
use axum::http::StatusCode;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

pub const DEFAULT_SLUG_PATTERN: &str = "^[a-z0-9]+(?:-[a-z0-9]+)*$";
pub const DEFAULT_RESERVED_SLUGS: &str = "dashboard,api,health";
pub const DEFAULT_LINK_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_REDIRECT_STATUS: u16 = 301;

const ALLOWED_REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_address: String,
    pub database_url: Option<String>,
    pub home_url: Option<String>,
    pub slug_pattern: Regex,
    pub reserved_slugs: HashSet<String>,
    /// Zero disables the read cache.
    pub link_cache_ttl: Duration,
    pub redirect_with_query: bool,
    pub case_sensitive: bool,
    pub redirect_status: StatusCode,
    pub preview_mode: bool,
    /// Hex encoded SHA3-256 digest of the admin API key.
    pub admin_key_hash: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let server_address = var("SERVER_ADDRESS").ok_or(ConfigError::Missing("SERVER_ADDRESS"))?;
        let slug_pattern = parse_slug_pattern(
            &var("SLUG_PATTERN").unwrap_or_else(|| DEFAULT_SLUG_PATTERN.to_string()),
        )?;
        let reserved_slugs =
            parse_reserved(&var("RESERVED_SLUGS").unwrap_or_else(|| DEFAULT_RESERVED_SLUGS.into()));
        let link_cache_ttl = match var("LINK_CACHE_TTL") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "LINK_CACHE_TTL",
                    value: value.clone(),
                    reason: "expected a number of seconds".into(),
                }
            })?),
            None => Duration::from_secs(DEFAULT_LINK_CACHE_TTL_SECS),
        };
        let redirect_status = match var("REDIRECT_STATUS_CODE") {
            Some(value) => parse_redirect_status(&value)?,
            None => StatusCode::MOVED_PERMANENTLY,
        };

        Ok(Settings {
            server_address,
            database_url: var("DATABASE_URL"),
            home_url: var("HOME_URL"),
            slug_pattern,
            reserved_slugs,
            link_cache_ttl,
            redirect_with_query: parse_flag("REDIRECT_WITH_QUERY", var("REDIRECT_WITH_QUERY"))?,
            case_sensitive: parse_flag("CASE_SENSITIVE", var("CASE_SENSITIVE"))?,
            redirect_status,
            preview_mode: parse_flag("PREVIEW_MODE", var("PREVIEW_MODE"))?,
            admin_key_hash: var("ADMIN_KEY_SHA3").map(|hash| hash.trim().to_lowercase()),
        })
    }

    /// Key under which a slug is looked up first.
    pub fn lookup_slug(&self, slug: &str) -> String {
        if self.case_sensitive {
            slug.to_string()
        } else {
            slug.to_lowercase()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server_address: "127.0.0.1:8080".into(),
            database_url: None,
            home_url: None,
            slug_pattern: compile_slug_pattern(DEFAULT_SLUG_PATTERN)
                .expect("Default slug pattern must compile"),
            reserved_slugs: parse_reserved(DEFAULT_RESERVED_SLUGS),
            link_cache_ttl: Duration::from_secs(DEFAULT_LINK_CACHE_TTL_SECS),
            redirect_with_query: false,
            case_sensitive: false,
            redirect_status: StatusCode::MOVED_PERMANENTLY,
            preview_mode: false,
            admin_key_hash: None,
        }
    }
}

fn compile_slug_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn parse_slug_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    compile_slug_pattern(pattern).map_err(|err| ConfigError::Invalid {
        name: "SLUG_PATTERN",
        value: pattern.to_string(),
        reason: err.to_string(),
    })
}

fn parse_reserved(list: &str) -> HashSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected true or false".into(),
        }),
    }
}

fn parse_redirect_status(value: &str) -> Result<StatusCode, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name: "REDIRECT_STATUS_CODE",
        value: value.to_string(),
        reason: reason.into(),
    };
    let code: u16 = value.trim().parse().map_err(|_| invalid("expected a number"))?;
    if !ALLOWED_REDIRECT_STATUSES.contains(&code) {
        return Err(invalid("expected one of 301, 302, 303, 307, 308"));
    }
    StatusCode::from_u16(code).map_err(|_| invalid("not an http status"))
}
