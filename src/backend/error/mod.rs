//! Backend Error Module
//!
//! Error types specific to the backend server.
//!
//! - **`types`** - `RealtimeError` and `BackendError` definitions
//! - **`conversion`** - `IntoResponse` for `BackendError`
//!
//! `RealtimeError` is reported to a single connection as a typed frame.
//! When the same failure happens behind a REST endpoint it is lifted into
//! `BackendError` with `?` and rendered as a JSON error body.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::{BackendError, RealtimeError};
