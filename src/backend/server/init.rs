/**
 * Server Initialization
 *
 * Builds the realtime service, its state and router, and starts the two
 * background producers.
 *
 * # Initialization Process
 *
 * 1. Connect to the database if one is configured
 * 2. Build the identity verifier and the metrics source
 * 3. Create the realtime service and the domain event queue
 * 4. Create the router
 * 5. Spawn the metrics ticker and the domain event consumer
 *
 * The background tasks live in the returned `JoinSet`. Shutting it down
 * stops both producers.
 */

use crate::backend::realtime::{domain_event_queue, MetricsSource, PgMetricsSource, RealtimeService};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Router plus the state and tasks behind it
pub struct App {
    pub router: Router,
    pub state: AppState,
    pub tasks: JoinSet<()>,
}

/// Create and configure the application from server configuration
pub async fn create_app(config: &ServerConfig) -> App {
    tracing::info!("[Server] Initializing shopdesk realtime server");

    // Step 1: Optional database
    let db_pool = load_database(config.database_url.as_deref()).await;

    // Step 2: Verifier and metrics source
    let verifier = config.identity_verifier();
    let source = db_pool
        .clone()
        .map(|pool| Arc::new(PgMetricsSource::new(pool)) as Arc<dyn MetricsSource>);

    // Step 3: Realtime service
    let service = Arc::new(RealtimeService::new(
        verifier,
        source,
        config.realtime.clone(),
    ));

    assemble(service, db_pool)
}

/// Wire an existing service into state, router and background tasks
///
/// Must be called from within a Tokio runtime.
pub fn assemble(service: Arc<RealtimeService>, db_pool: Option<PgPool>) -> App {
    let (events, queue) = domain_event_queue();
    let state = AppState::new(service.clone(), events, db_pool);

    // Step 4: Router
    let router = create_router(state.clone());

    // Step 5: Background producers
    let mut tasks = JoinSet::new();
    tasks.spawn(service.clone().run_ticker());
    tasks.spawn(queue.run(service));

    tracing::info!(
        "[Server] Router configured, tick every {:?}",
        state.realtime.config().tick_interval()
    );

    App {
        router,
        state,
        tasks,
    }
}
