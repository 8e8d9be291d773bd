//! Connection lifecycle: handshake, topics, disconnect

use crate::common::*;
use crate::{assert_err, assert_no_frame};
use pretty_assertions::assert_eq;
use shopdesk::backend::error::RealtimeError;
use shopdesk::backend::realtime::{AuthState, GroupKey, RealtimeService};
use shopdesk::shared::{RealtimeConfig, Role};
use std::sync::Arc;
use std::time::Duration;

fn service(source: Arc<FakeSource>) -> RealtimeService {
    RealtimeService::new(jwt_verifier(), Some(source), RealtimeConfig::default())
}

#[tokio::test]
async fn test_handshake_order_for_worker() {
    let service = service(Arc::new(FakeSource::new(sample_figures(3))));
    let (_id, _rx, frames) = connect_as(&service, &worker()).await;

    assert_eq!(
        types(&frames),
        vec!["authenticated", "metrics_update", "activity_feed"]
    );
    assert_eq!(frames[0]["user"]["userId"], "u-worker");
    assert_eq!(frames[2]["activities"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_privileged_handshake_includes_presence() {
    let service = service(Arc::new(FakeSource::new(sample_figures(3))));
    let (_id, _rx, frames) = connect_as(&service, &owner()).await;

    let presence = of_type(&frames, "active_users_update");
    assert_eq!(presence.len(), 1);
    assert_eq!(presence[0]["count"], 1);
    assert_eq!(presence[0]["users"][0]["userId"], "u-owner");
}

#[tokio::test]
async fn test_first_metrics_update_counts_live_connections() {
    let service = service(Arc::new(FakeSource::new(sample_figures(3))));
    let (_id, _rx, frames) = connect_as(&service, &customer()).await;

    let metrics = of_type(&frames, "metrics_update");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["activeUsers"], 1);
    assert!(metrics[0].get("todayRevenue").is_none());

    let (_o, _orx, frames) = connect_as(&service, &owner()).await;
    assert_eq!(of_type(&frames, "metrics_update")[0]["activeUsers"], 2);
}

#[tokio::test]
async fn test_handshake_survives_unavailable_activity_feed() {
    let source = Arc::new(FakeSource::new(sample_figures(3)));
    source.set_failing(true);
    let service = service(source);
    let (_id, _rx, frames) = connect_as(&service, &worker()).await;

    let feed = of_type(&frames, "activity_feed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["activities"], serde_json::json!([]));
    assert_no_frame!(frames, "error");
}

#[tokio::test]
async fn test_bad_token_keeps_connection_unauthenticated() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (id, mut rx) = service.on_connect().await;

    service.on_authenticate(id, "not-a-jwt").await;
    let frames = drain(&mut rx);
    assert_eq!(types(&frames), vec!["auth_error"]);
    assert_eq!(
        service.registry().state_of(id).await,
        Some(AuthState::Unauthenticated)
    );
    assert!(service.registry().groups_of(id).await.is_empty());

    service.on_authenticate(id, &token_for(&worker())).await;
    assert_eq!(types(&drain(&mut rx))[0], "authenticated");
}

#[tokio::test]
async fn test_second_authenticate_is_rejected() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (id, mut rx, _) = connect_as(&service, &worker()).await;

    service.on_authenticate(id, &token_for(&admin())).await;
    let frames = drain(&mut rx);
    assert_eq!(frames[0]["type"], "auth_error");
    assert_eq!(frames[0]["message"], "already authenticated");
    assert_eq!(
        service.registry().identity_of(id).await.map(|i| i.role),
        Some(Role::Worker)
    );
}

#[tokio::test]
async fn test_requests_before_authentication() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (id, mut rx) = service.on_connect().await;

    service.handle_text(id, r#"{"type":"request_metrics"}"#).await;
    service
        .handle_text(id, r#"{"type":"subscribe_topic","topic":"transactions"}"#)
        .await;
    service.handle_text(id, r#"{"type":"ping"}"#).await;
    service.handle_text(id, "{not json").await;

    let frames = drain(&mut rx);
    assert_eq!(
        types(&frames),
        vec!["auth_error", "error", "pong", "error"]
    );
    assert_eq!(frames[0]["message"], "authenticate first");
    assert_eq!(frames[1]["code"], "permission_error");
    assert_eq!(frames[3]["code"], "invalid_message");
}

// Scenario A
#[tokio::test]
async fn test_worker_subscribes_to_inventory_alerts() {
    let service = service(Arc::new(FakeSource::new(sample_figures(2))));
    service.tick().await;
    let (id, mut rx, _) = connect_as(&service, &worker()).await;

    service
        .handle_text(id, r#"{"type":"subscribe_topic","topic":"inventory_alerts"}"#)
        .await;

    let frames = drain(&mut rx);
    assert_eq!(types(&frames), vec!["subscribed", "inventory_update"]);
    assert_eq!(frames[0]["topic"], "inventory_alerts");
    assert_eq!(frames[1]["data"][0]["itemId"], "inv-1");
    assert_eq!(frames[1]["data"].as_array().unwrap().len(), 1);

    service
        .handle_text(id, r#"{"type":"subscribe_topic","topic":"inventory_alerts"}"#)
        .await;
    assert_eq!(
        service
            .registry()
            .group_size(&GroupKey::Topic(shopdesk::backend::realtime::Topic::InventoryAlerts))
            .await,
        1
    );
}

#[tokio::test]
async fn test_customer_cannot_subscribe_to_transactions() {
    let service = service(Arc::new(FakeSource::new(sample_figures(2))));
    let (id, mut rx, _) = connect_as(&service, &customer()).await;

    service.on_subscribe_topic(id, "transactions").await;
    service.on_subscribe_topic(id, "notifications:u-admin").await;
    service.on_subscribe_topic(id, "payroll").await;

    let frames = drain(&mut rx);
    assert_eq!(types(&frames), vec!["error", "error", "error"]);
    assert!(frames.iter().all(|f| f["code"] == "permission_error"));
    assert_eq!(frames[2]["message"], "unknown topic");
}

#[tokio::test]
async fn test_own_notifications_topic() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (id, mut rx, _) = connect_as(&service, &customer()).await;

    service.on_subscribe_topic(id, "notifications").await;
    let frames = drain(&mut rx);
    assert_eq!(types(&frames), vec!["subscribed"]);
    assert_eq!(frames[0]["topic"], "notifications:u-customer");
}

// P1
#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (_admin_id, mut admin_rx, _) = connect_as(&service, &admin()).await;
    let (worker_id, _worker_rx, _) = connect_as(&service, &worker()).await;
    drain(&mut admin_rx);

    service.on_disconnect(worker_id).await;
    service.on_disconnect(worker_id).await;

    let frames = drain(&mut admin_rx);
    assert_eq!(
        types(&frames),
        vec!["user_status_update", "active_users_update"]
    );
    assert_eq!(frames[0]["data"]["status"], "offline");
    assert_eq!(frames[0]["data"]["userId"], "u-worker");
    assert_eq!(frames[1]["count"], 1);
    assert!(!service.is_user_connected("u-worker").await);
    assert_eq!(service.registry().state_of(worker_id).await, None);
}

#[tokio::test]
async fn test_disconnect_of_anonymous_connection_is_silent() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (_admin_id, mut admin_rx, _) = connect_as(&service, &admin()).await;
    let (anon, _anon_rx) = service.on_connect().await;
    drain(&mut admin_rx);

    service.on_disconnect(anon).await;
    assert!(drain(&mut admin_rx).is_empty());
    assert_eq!(service.registry().connection_count().await, 1);
}

// Scenario D
#[tokio::test]
async fn test_disconnect_before_first_tick() {
    let service = service(Arc::new(FakeSource::new(sample_figures(0))));
    let (_owner_id, mut owner_rx, _) = connect_as(&service, &owner()).await;
    let (worker_id, _worker_rx, _) = connect_as(&service, &worker()).await;
    drain(&mut owner_rx);

    service.on_disconnect(worker_id).await;

    let frames = drain(&mut owner_rx);
    assert_no_frame!(frames, "metrics_update");
    let presence = of_type(&frames, "active_users_update");
    assert_eq!(presence.len(), 1);
    assert_eq!(presence[0]["count"], 1);
    assert_eq!(service.active_user_count().await, 1);
}

// P2
#[tokio::test]
async fn test_concurrent_authentication_admits_one() {
    let verifier = Arc::new(GatedVerifier::new(worker()));
    let service = Arc::new(RealtimeService::new(
        verifier.clone(),
        None,
        RealtimeConfig::default(),
    ));
    let (id, mut rx) = service.on_connect().await;

    let first = tokio::spawn({
        let service = service.clone();
        async move { service.on_authenticate(id, "one").await }
    });
    verifier.wait_for_call().await;
    assert_eq!(
        service.registry().state_of(id).await,
        Some(AuthState::Authenticating)
    );

    let second = service
        .registry()
        .authenticate(id, "two", verifier.as_ref(), Duration::from_secs(1))
        .await;
    assert_err!(second, RealtimeError::AuthError { .. });

    verifier.release();
    first.await.unwrap();

    let frames = drain(&mut rx);
    assert_eq!(of_type(&frames, "authenticated").len(), 1);
    assert_eq!(
        service.registry().groups_of(id).await.len(),
        3,
        "role, user and shop groups"
    );
}

#[tokio::test]
async fn test_removed_while_verifying_joins_nothing() {
    let verifier = Arc::new(GatedVerifier::new(worker()));
    let service = Arc::new(RealtimeService::new(
        verifier.clone(),
        None,
        RealtimeConfig::default(),
    ));
    let (id, _rx) = service.on_connect().await;

    let pending = tokio::spawn({
        let service = service.clone();
        async move { service.on_authenticate(id, "t").await }
    });
    verifier.wait_for_call().await;
    service.on_disconnect(id).await;
    verifier.release();
    pending.await.unwrap();

    assert_eq!(service.registry().connection_count().await, 0);
    assert_eq!(service.registry().group_size(&GroupKey::role(Role::Worker)).await, 0);
    assert!(!service.is_user_connected("u-worker").await);
}
