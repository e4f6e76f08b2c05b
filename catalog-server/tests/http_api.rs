//! Router-level tests driven through `tower::ServiceExt::oneshot`

mod common;

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use catalog_server::ServerState;
use catalog_server::api::create_router;
use catalog_server::pricing::PipelineConfig;
use common::*;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(debug_enabled: bool) -> Router {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_state_price(state_price("sku-1", "Pune", 98000));
    backend.add_primary_dealer(primary_mapping("Pune", PRIMARY_DEALER));
    backend.add_tenant(tenant(PRIMARY_DEALER, "Pune Motors"));
    backend.set_dealer_offers(PRIMARY_DEALER, "MH", vec![offer(PRIMARY_DEALER, "sku-1", -5000)]);

    let state = ServerState::new(backend, PipelineConfig::default(), debug_enabled);
    create_router(state, Duration::from_secs(5))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app(false);
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "catalog-server");
}

#[tokio::test]
async fn test_load_prices_catalog() {
    let app = app(false);
    let (status, body) = send(
        &app,
        post_json(
            "/api/catalog/sessions/s-1/load",
            json!({ "cachedLocation": PUNE_CACHE }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLoading"], false);
    assert!(body["error"].is_null());
    let price = &body["items"][0]["price"];
    assert_eq!(price["onRoad"], 98000.0);
    assert_eq!(price["offerPrice"], 93000.0);
    assert_eq!(price["discount"], 5000.0);
    assert_eq!(price["pricingSource"], "Pune, MH");
    assert_eq!(price["isEstimate"], false);
    assert_eq!(body["items"][0]["dealer"]["name"], "Pune Motors");
}

#[tokio::test]
async fn test_cached_location_accepts_inline_object() {
    let app = app(false);
    let (status, body) = send(
        &app,
        post_json(
            "/api/catalog/sessions/s-1/load",
            json!({ "cachedLocation": { "stateCode": "MH", "district": "Pune" } }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["price"]["pricingSource"], "Pune, MH");
}

#[tokio::test]
async fn test_load_without_body_uses_default_state() {
    let app = app(false);
    let request = Request::builder()
        .method("POST")
        .uri("/api/catalog/sessions/s-1/load")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let price = &body["items"][0]["price"];
    assert_eq!(price["pricingSource"], "ALL, MH");
    assert_eq!(price["onRoad"], 100000.0);
    assert!(body["items"][0].get("dealer").is_none());
}

#[tokio::test]
async fn test_get_returns_last_committed_state() {
    let app = app(false);
    let (_, loaded) = send(
        &app,
        post_json("/api/catalog/sessions/s-1/load", json!({ "cachedLocation": PUNE_CACHE })),
    )
    .await;

    let (status, body) = send(&app, get("/api/catalog/sessions/s-1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, loaded);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = app(false);
    let (status, body) = send(&app, get("/api/catalog/sessions/missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 3002);
}

#[tokio::test]
async fn test_overlong_session_id_rejected() {
    let app = app(false);
    let uri = format!("/api/catalog/sessions/{}/load", "x".repeat(200));
    let (status, _) = send(&app, post_json(&uri, json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_debug_disabled_by_default() {
    let app = app(false);
    send(&app, post_json("/api/catalog/sessions/s-1/load", json!({}))).await;

    let (status, body) = send(&app, get("/api/catalog/sessions/s-1/debug")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4002);
}

#[tokio::test]
async fn test_debug_record_after_load() {
    let app = app(true);
    let (status, _) = send(&app, get("/api/catalog/sessions/s-1/debug")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        post_json("/api/catalog/sessions/s-1/load", json!({ "cachedLocation": PUNE_CACHE })),
    )
    .await;
    let (status, body) = send(&app, get("/api/catalog/sessions/s-1/debug")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stateCode"], "MH");
    assert_eq!(body["district"], "Pune");
    assert_eq!(body["dealerId"], PRIMARY_DEALER);
    assert_eq!(body["dealerSource"], "district_primary");
    assert_eq!(body["marketOffersCount"], 1);
    assert_eq!(body["catalogSource"], "deep");
}
