use crate::access_log::{AccessLog, Visit};
use crate::auth::auth;
use crate::config::Settings;
use crate::error::AppError;
use crate::hits::{apply_hit, HitAccountant};
use crate::model::{LinkTarget, ResetRequest, ResetResponse};
use crate::policy::{check_hit_limit, check_view_expiry, Verdict};
use crate::render;
use crate::reset::reset_link;
use crate::resolver::{Resolution, SlugResolver};
use crate::store::KeyValueStore;
use crate::utils::{client_ip, get_header, now_epoch, short_link};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn KeyValueStore>,
    pub resolver: Arc<SlugResolver>,
    pub hits: Arc<HitAccountant>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        access_log: Arc<dyn AccessLog>,
    ) -> Self {
        let settings = Arc::new(settings);
        AppState {
            resolver: Arc::new(SlugResolver::new(store.clone(), settings.clone())),
            hits: Arc::new(HitAccountant::new(store.clone(), access_log)),
            settings,
            store,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/link/reset",
            post(reset).route_layer(from_fn_with_state(state.clone(), auth)),
        )
        .route("/health", get(health))
        .fallback(serve_link)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /<slug>`: resolve, enforce expiry, count, then redirect or render.
pub async fn serve_link(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET {
        return not_found();
    }

    let link = match state.resolver.resolve(uri.path()).await {
        Resolution::Home(home_url) => return render::redirect(&home_url, StatusCode::FOUND),
        Resolution::NotFound => return not_found(),
        Resolution::Found(link) => link,
    };

    if check_hit_limit(&link.record) == Verdict::Exhausted {
        tracing::debug!("Link {} reached its hit limit", link.key);
        return render::expired_page();
    }

    let now = now_epoch();
    let updated = apply_hit(&link.record, now);
    if check_view_expiry(&updated, now) == Verdict::ViewExpired {
        tracing::debug!("Link {} self-destructed", link.key);
        return render::expired_page();
    }

    let visit = Visit {
        referer: get_header("Referer", &headers),
        user_agent: get_header("User-Agent", &headers),
        ip: client_ip(&headers),
    };
    // persistence continues in the background
    let _ = state.hits.record(&link.key, &updated, &visit).await;

    match &link.target {
        LinkTarget::Text { content } => render::text_page(&updated, content, updated.view_expires_at()),
        LinkTarget::Redirect { url } => {
            let location = if state.settings.redirect_with_query {
                render::merge_query(url, uri.query())
            } else {
                url.clone()
            };
            render::redirect(&location, state.settings.redirect_status)
        }
    }
}

/// `POST /api/link/reset`
pub async fn reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResetRequest>,
) -> Result<Response, AppError> {
    let slug = request.slug.unwrap_or_default();
    let reset = reset_link(
        state.store.as_ref(),
        &state.resolver,
        &state.settings,
        &slug,
        now_epoch(),
    )
    .await?;
    Ok(match reset {
        Some(link) => {
            let short_link = short_link(&headers, &link.slug);
            Json(ResetResponse { link, short_link }).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}
