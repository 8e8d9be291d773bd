//! Polling fallback against the hosted identity provider

use crate::common::*;
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    response::Response,
};
use pretty_assertions::assert_eq;
use shopdesk::backend::auth::HttpIdentityVerifier;
use shopdesk::backend::realtime::RealtimeService;
use shopdesk::backend::server::{assemble, create_app, ServerConfig};
use shopdesk::shared::RealtimeConfig;
use std::sync::Arc;
use tower::ServiceExt;

async fn provider() -> String {
    MockAuthProvider::new()
        .with_user(
            "owner-token",
            serde_json::json!({
                "id": "u-owner",
                "email": "oz@shop.test",
                "user_metadata": {"username": "oz", "role": "owner", "shop_id": "shop-1"}
            }),
        )
        .with_user(
            "worker-token",
            serde_json::json!({
                "id": "u-worker",
                "email": "wes@shop.test",
                "user_metadata": {"role": "worker", "tenant_id": "shop-1"}
            }),
        )
        .spawn()
        .await
}

async fn service() -> Arc<RealtimeService> {
    let verifier = Arc::new(HttpIdentityVerifier::new(provider().await));
    Arc::new(RealtimeService::new(
        verifier,
        Some(Arc::new(FakeSource::new(sample_figures(12)))),
        RealtimeConfig::default(),
    ))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body).unwrap()
}

async fn json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_metrics_via_hosted_provider() {
    let service = service().await;
    service.tick().await;
    let app = assemble(service, None);

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/api/realtime/metrics", Some("owner-token"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["todayRevenue"], 640.5);
    assert_eq!(body["recentTransactions"].as_array().unwrap().len(), 10);

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/api/realtime/metrics", Some("stolen"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["status"], 401);
}

#[tokio::test]
async fn test_websocket_handshake_via_hosted_provider() {
    let service = service().await;
    let (id, mut rx) = service.on_connect().await;
    service
        .handle_text(id, r#"{"type":"authenticate","token":"worker-token"}"#)
        .await;

    let frames = drain(&mut rx);
    assert_eq!(frames[0]["type"], "authenticated");
    assert_eq!(frames[0]["user"]["role"], "worker");
    assert_eq!(frames[0]["user"]["tenantId"], "shop-1");
    assert_eq!(frames[0]["user"]["username"], "wes@shop.test");
}

#[tokio::test]
async fn test_event_ingestion_reaches_socket_clients() {
    let service = service().await;
    let (id, mut rx) = service.on_connect().await;
    service.on_authenticate(id, "owner-token").await;
    drain(&mut rx);

    let app = assemble(service, None);
    let response = app
        .router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/realtime/events",
            Some("worker-token"),
            Body::from(
                serde_json::json!({
                    "kind": "transaction",
                    "data": {"id": "tx-100", "amount": 45.0},
                    "shopId": "shop-1"
                })
                .to_string(),
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("event delivered")
        .unwrap();
    let message: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(message["type"], "transaction_update");
    assert_eq!(message["data"]["id"], "tx-100");
}

#[tokio::test]
async fn test_create_app_from_config_serves_health() {
    let config = ServerConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("secret".to_string()),
        _ => None,
    })
    .unwrap();
    let mut app = create_app(&config).await;

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/health", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json(response).await,
        serde_json::json!({"status": "ok", "connections": 0, "authenticated": 0})
    );

    assert_eq!(app.tasks.len(), 2);
    app.tasks.shutdown().await;
}
