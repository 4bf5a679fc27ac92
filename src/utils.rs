use crate::error::AppError;
use axum::http::{header, HeaderMap};
use std::future::Future;
use std::time::Duration;

pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

pub async fn with_timeout<F: Future>(
    duration_in_mills: u64,
    task: F,
) -> Result<<F as Future>::Output, AppError> {
    tokio::time::timeout(Duration::from_millis(duration_in_mills), task)
        .await
        .map_err(|_| AppError::Timeout)
}

pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().to_string())
}

/// `scheme://host/slug` as seen by the client.
pub fn short_link(headers: &HeaderMap, slug: &str) -> String {
    let scheme = get_header("X-Forwarded-Proto", headers)
        .and_then(|value| value.split(',').next().map(|first| first.trim().to_string()))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "http".to_string());
    let host = get_header("X-Forwarded-Host", headers)
        .or_else(|| get_header(header::HOST.as_str(), headers))
        .unwrap_or_else(|| "localhost".to_string());
    format!("{scheme}://{host}/{slug}")
}

/// Client address, preferring the first hop reported by a proxy.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    get_header("X-Forwarded-For", headers)
        .and_then(|value| value.split(',').next().map(|first| first.trim().to_string()))
        .filter(|value| !value.is_empty())
        .or_else(|| get_header("X-Real-IP", headers))
}
