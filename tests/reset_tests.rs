//! Administrative reset of hit state.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};

use common::{app, body_json, body_text, test_settings, TestApp, API_KEY};
use link_redirector::config::Settings;

fn reset_request(body: Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/link/reset")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "host")
        .header("x-forwarded-proto", "https");
    if let Some(api_key) = api_key {
        builder = builder.header("x-api-key", api_key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn seed_viewed(app: &TestApp) {
    app.seed(
        "link:x",
        json!({
            "slug": "x",
            "url": "https://example.com",
            "comment": "launch",
            "hitCount": 5,
            "firstHitAt": 1000,
            "createdAt": 900
        }),
    )
    .await;
}

#[tokio::test]
async fn reset_zeroes_hits_and_returns_short_link() {
    let app = app(test_settings());
    seed_viewed(&app).await;

    let response = app
        .send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["shortLink"], "https://host/x");
    assert_eq!(body["link"]["hitCount"], 0);
    assert!(body["link"].get("firstHitAt").is_none());
    assert!(body["link"]["updatedAt"].as_i64().is_some());
    assert_eq!(body["link"]["createdAt"], 900);

    let stored = app.record("x").await;
    assert_eq!(stored.hit_count, 0);
    assert_eq!(stored.first_hit_at, None);
    assert_eq!(
        app.backing.metadata("link:x").await,
        Some(json!({"expiration": null, "url": "https://example.com", "comment": "launch"}))
    );
}

#[tokio::test]
async fn reset_twice_is_idempotent_and_advances_updated_at() {
    let app = app(test_settings());
    seed_viewed(&app).await;

    let first = body_json(
        app.send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
            .await,
    )
    .await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = body_json(
        app.send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
            .await,
    )
    .await;

    for body in [&first, &second] {
        assert_eq!(body["link"]["hitCount"], 0);
        assert!(body["link"].get("firstHitAt").is_none());
    }
    let first_updated = first["link"]["updatedAt"].as_i64().unwrap();
    let second_updated = second["link"]["updatedAt"].as_i64().unwrap();
    assert!(second_updated > first_updated);
}

#[tokio::test]
async fn reset_restarts_the_viewing_lifetime() {
    let app = app(test_settings());
    app.seed(
        "link:once",
        json!({"slug": "once", "url": "https://example.com", "maxHits": 1, "hitCount": 1}),
    )
    .await;
    assert_eq!(app.get("/once").await.status(), StatusCode::GONE);

    let response = app
        .send(reset_request(json!({"slug": "once"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.get("/once").await.status(), StatusCode::MOVED_PERMANENTLY);
    let stored = app.wait_for_hits("once", 1).await;
    assert!(stored.first_hit_at.is_some());
}

#[tokio::test]
async fn reset_is_forbidden_in_preview_mode() {
    let app = app(Settings {
        preview_mode: true,
        ..test_settings()
    });
    seed_viewed(&app).await;

    let response = app
        .send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, "Preview mode cannot reset links.");
    assert_eq!(app.record("x").await.hit_count, 5);
}

#[tokio::test]
async fn missing_or_unknown_slug_is_a_silent_no_op() {
    let app = app(test_settings());

    let response = app.send(reset_request(json!({}), Some(API_KEY))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(reset_request(json!({"slug": "ghost"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.backing.is_empty().await);
}

#[tokio::test]
async fn store_outage_fails_the_reset() {
    let app = app(test_settings());
    seed_viewed(&app).await;

    app.faults.fail_reads(true);
    let response = app
        .send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Internal server error");

    app.faults.fail_reads(false);
    app.faults.fail_writes(true);
    let response = app
        .send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.record("x").await.hit_count, 5);
}

#[tokio::test]
async fn record_without_destination_can_still_be_reset() {
    let app = app(test_settings());
    app.seed(
        "link:draft",
        json!({"slug": "draft", "hitCount": 4, "firstHitAt": 1000}),
    )
    .await;

    let response = app
        .send(reset_request(json!({"slug": "draft"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["link"]["hitCount"], 0);
    assert!(body["link"].get("firstHitAt").is_none());
}

#[tokio::test]
async fn reset_requires_the_admin_key() {
    let app = app(test_settings());
    seed_viewed(&app).await;

    let response = app.send(reset_request(json!({"slug": "x"}), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(reset_request(json!({"slug": "x"}), Some("wrong")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.record("x").await.hit_count, 5);

    let bearer = Request::post("/api/link/reset")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
        .body(Body::from(json!({"slug": "x"}).to_string()))
        .unwrap();
    assert_eq!(app.send(bearer).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_api_is_closed_without_a_configured_key() {
    let app = app(Settings {
        admin_key_hash: None,
        ..test_settings()
    });
    seed_viewed(&app).await;

    let response = app
        .send(reset_request(json!({"slug": "x"}), Some(API_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
