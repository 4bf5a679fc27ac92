use crate::error::AppError;
use crate::routes::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::IntoResponse;
use sha3::{Digest, Sha3_256};

pub const API_KEY_HEADER: &str = "x-api-key";

pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(api_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Admin routes require `x-api-key` (or a bearer token) whose SHA3-256 digest
/// matches the configured hash. Without a configured hash every call fails.
pub async fn auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let Some(expected) = state.settings.admin_key_hash.as_deref() else {
        tracing::warn!("Admin call rejected: no admin key configured");
        return Err(AppError::Unauthorized);
    };
    let headers = request.headers();
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
        })
        .ok_or(AppError::Unauthorized)?;

    if hash_api_key(provided.trim()) != expected {
        tracing::warn!("Admin call rejected: invalid key");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}
