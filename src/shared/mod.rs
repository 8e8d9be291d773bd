//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and its clients. Everything here is plain data: it serializes
//! to the JSON frames carried over the realtime WebSocket and the polling
//! fallback endpoints.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! without the `ssr` feature, so client tooling and tests can depend on the
//! wire format alone.

/// Identity and role types
pub mod identity;

/// Business metrics snapshot and role projection
pub mod metrics;

/// Real-time event system
pub mod event;

/// Client/server WebSocket protocol
pub mod protocol;

/// Shared error types
pub mod error;

/// Realtime configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, RealtimeConfig, RealtimeConfigBuilder};
pub use error::SharedError;
pub use event::{EventKind, RealtimeEvent};
pub use identity::{Identity, Role};
pub use metrics::{
    project_for_role, ActiveUser, Activity, BusinessMetricsSnapshot, InventoryAlert,
    RoleMetricsView, TransactionSummary,
};
pub use protocol::{ClientMessage, EventEnvelope, ServerMessage};
