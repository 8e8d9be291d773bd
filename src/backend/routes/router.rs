/**
 * Router Configuration
 *
 * Combines all route configurations into a single Axum router.
 *
 * # Routes
 *
 * - `GET /ws` - realtime WebSocket, authenticated in-band
 * - `GET /health` - liveness plus connection counts
 * - `/api/realtime/{metrics,activity,presence,events}` - polling fallback
 *   and event ingestion, bearer token required (see `api_routes`)
 *
 * CORS is permissive; dashboards are served from a different origin.
 */

use crate::backend::middleware::auth_middleware;
use crate::backend::realtime::{ws_upgrade, RealtimeService};
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;
use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    /// Open connections, authenticated or not
    pub connections: usize,
    pub authenticated: usize,
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let api = configure_api_routes(Router::new()).route_layer(middleware::from_fn_with_state(
        app_state.clone(),
        auth_middleware,
    ));

    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .nest("/api/realtime", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// GET /health
pub async fn health(State(service): State<Arc<RealtimeService>>) -> Json<HealthStatus> {
    let registry = service.registry();
    Json(HealthStatus {
        status: "ok".to_string(),
        connections: registry.connection_count().await,
        authenticated: registry.count().await,
    })
}
