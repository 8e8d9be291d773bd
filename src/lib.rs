//! Shopdesk - Realtime Presence & Business Metrics
//!
//! Shopdesk is the back-office for a small repair shop: transactions,
//! billing, inventory and supplier ledgers. The CRUD surface lives in thin
//! REST handlers elsewhere; this crate holds the long-lived part of the
//! server, the realtime service that keeps every connected dashboard current.
//!
//! # Overview
//!
//! - Accepts WebSocket connections and authenticates each one independently
//! - Tracks identity, role and shop per connection
//! - Organizes connections into overlapping broadcast groups
//!   (`role:<role>`, `user:<id>`, `shop:<id>` and opt-in topics)
//! - Recomputes business metrics on a fixed tick and pushes a role-filtered
//!   view to every authenticated connection
//! - Routes domain events (new transaction, inventory change, notification)
//!   to the right subset of connections
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types shared with clients
//!   - Client/server protocol messages, identities and roles
//!   - Metrics snapshot and its per-role projection
//!   - Realtime event type, configuration, error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Connection registry and group membership index
//!   - Broadcast engine, metrics aggregator, realtime orchestrator
//!   - Axum WebSocket transport, polling fallback routes, auth middleware
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server build (enabled by default). Pulls in Axum, the JWT
//!   verifier and the tracing subscriber.
//!
//! # Thread Safety
//!
//! - The connection registry and its group index sit behind a single
//!   `tokio::sync::RwLock` so fan-out never observes a half-applied change
//! - The metrics snapshot is swapped atomically through `ArcSwap`
//! - Per-connection outbound queues are unbounded `mpsc` channels
//!
//! # Error Handling
//!
//! - `shared::error::SharedError` for parsing and validation failures
//! - `backend::error::RealtimeError` for the realtime taxonomy
//!   (auth, permission, upstream, transport)
//! - `backend::error::BackendError` for HTTP responses

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
