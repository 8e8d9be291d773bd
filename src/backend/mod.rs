//! Backend Module
//!
//! All server-side code for the shopdesk realtime service. Only compiled
//! with the `ssr` feature.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - Router assembly, health and polling fallback routes
//! - **`realtime`** - Connection registry, broadcast engine, metrics
//!   aggregator, domain event queue and WebSocket transport
//! - **`auth`** - JWT sessions and identity verifiers
//! - **`middleware`** - Bearer token authentication for HTTP routes
//! - **`error`** - Realtime error taxonomy and HTTP error responses
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Config, state, initialization
//! ├── routes/         - Route configuration
//! ├── realtime/       - Presence, groups, metrics, broadcast
//! ├── auth/           - Token verification
//! ├── middleware/     - Request middleware
//! └── error/          - Error types
//! ```
//!
//! # State Management
//!
//! `AppState` holds the `Arc<RealtimeService>`, the domain event publisher
//! and the optional database pool. Handlers extract the part they need via
//! `FromRef`.
//!
//! # Thread Safety
//!
//! - The connection table and group index share one `RwLock`; membership
//!   changes are atomic with respect to fan-out
//! - Metrics snapshots are immutable and swapped through `ArcSwap`
//! - Each connection owns an unbounded outbound queue drained by its writer
//!   task, so a slow socket never blocks a broadcast

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Real-time presence and metrics
pub mod realtime;

/// Backend error types
pub mod error;

/// Authentication and identity verification
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Re-export commonly used types
pub use error::{BackendError, RealtimeError};
pub use realtime::{DomainEventPublisher, RealtimeService};
pub use server::{create_app, AppState, ServerConfig};
