//! Real-time Presence and Metrics
//!
//! Long-lived WebSocket connections, authenticated in-band, grouped by role,
//! user and shop, and fed with role-filtered business metrics and domain
//! events.
//!
//! - **`groups`** - group keys and topic entitlements
//! - **`registry`** - connection table and group index behind one lock
//! - **`broadcast`** - serialize-once fan-out with dead-recipient reporting
//! - **`metrics`** - snapshot cache over a pluggable `MetricsSource`
//! - **`db`** - PostgreSQL `MetricsSource`
//! - **`service`** - connection state machine and public broadcast API
//! - **`events`** - domain event queue and its consumer
//! - **`socket`** - axum WebSocket transport
//!
//! Two producers feed the broadcast engine: the metrics ticker
//! (`RealtimeService::run_ticker`) and the domain event consumer
//! (`DomainEventQueue::run`). They run as separate tasks and never wait on
//! each other.

pub mod broadcast;
pub mod db;
pub mod events;
pub mod groups;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod socket;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use broadcast::{BroadcastEngine, DeliveryReport};
pub use db::PgMetricsSource;
pub use events::{domain_event_queue, DomainEventPublisher, DomainEventQueue, PublishError};
pub use groups::{GroupKey, Topic};
pub use metrics::{MetricsAggregator, MetricsFigures, MetricsSource};
pub use registry::{AuthState, ConnectionId, ConnectionRegistry, RemovedConnection};
pub use service::RealtimeService;
pub use socket::ws_upgrade;
