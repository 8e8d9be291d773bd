/**
 * Application State Management
 *
 * `AppState` is the central state container handed to the router. The
 * `FromRef` implementations let handlers extract just the part they need,
 * e.g. `State(service): State<Arc<RealtimeService>>`.
 */

use crate::backend::auth::IdentityVerifier;
use crate::backend::realtime::{DomainEventPublisher, RealtimeService};
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Realtime service: registry, broadcast engine and metrics cache
    pub realtime: Arc<RealtimeService>,

    /// Producer side of the domain event queue
    pub events: DomainEventPublisher,

    /// Database connection pool
    ///
    /// `None` when `DATABASE_URL` is not set. The realtime service then
    /// serves the all-zero snapshot.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        realtime: Arc<RealtimeService>,
        events: DomainEventPublisher,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            realtime,
            events,
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<RealtimeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.realtime.clone()
    }
}

impl FromRef<AppState> for DomainEventPublisher {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.events.clone()
    }
}

impl FromRef<AppState> for Arc<dyn IdentityVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.realtime.verifier()
    }
}

impl FromRef<AppState> for Option<PgPool> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
