/**
 * API Route Handlers
 *
 * Polling fallback for clients that cannot hold a WebSocket open, and the
 * ingestion endpoint CRUD handlers in other processes use to raise domain
 * events.
 *
 * # Routes (nested under `/api/realtime`, bearer token required)
 *
 * - `GET /metrics` - role projection of the cached snapshot
 * - `GET /activity?limit&offset` - page of the activity feed
 * - `GET /presence` - active user count, plus the user list for admins and owners
 * - `POST /events` - enqueue a domain event (staff only)
 */

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::{DomainEventPublisher, PublishError, RealtimeService};
use crate::backend::server::state::AppState;
use crate::shared::{Activity, RealtimeEvent, RoleMetricsView, ServerMessage};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
}

/// Configure the realtime API routes
///
/// Paths are relative; the router nests them under `/api/realtime` behind
/// the auth middleware.
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/metrics", get(get_metrics))
        .route("/activity", get(get_activity))
        .route("/presence", get(get_presence))
        .route("/events", post(post_event))
}

/// GET /api/realtime/metrics
pub async fn get_metrics(
    State(service): State<Arc<RealtimeService>>,
    AuthUser(identity): AuthUser,
) -> Json<RoleMetricsView> {
    Json(service.metrics_view(&identity.role).await)
}

/// GET /api/realtime/activity
pub async fn get_activity(
    State(service): State<Arc<RealtimeService>>,
    _user: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityPage>, BackendError> {
    let activities = service
        .metrics()
        .activity_feed(query.limit, query.offset)
        .await?;
    Ok(Json(ActivityPage { activities }))
}

/// GET /api/realtime/presence
pub async fn get_presence(
    State(service): State<Arc<RealtimeService>>,
    AuthUser(identity): AuthUser,
) -> Json<ServerMessage> {
    Json(
        service
            .active_users_update(identity.role.is_privileged())
            .await,
    )
}

/// POST /api/realtime/events
///
/// Returns 202 once the event is queued. Delivery happens on the consumer
/// task.
pub async fn post_event(
    State(publisher): State<DomainEventPublisher>,
    user: AuthUser,
    Json(event): Json<RealtimeEvent>,
) -> Result<StatusCode, BackendError> {
    let identity = user.require_staff()?;
    let kind = event.kind;
    publisher.publish(event).map_err(|e| match e {
        PublishError::Invalid(err) => BackendError::from(err),
        PublishError::Closed => {
            BackendError::handler(StatusCode::SERVICE_UNAVAILABLE, "event consumer has stopped")
        }
    })?;
    tracing::debug!(
        user_id = %identity.user_id,
        kind = kind.message_type(),
        "[Realtime] Domain event queued"
    );
    Ok(StatusCode::ACCEPTED)
}
