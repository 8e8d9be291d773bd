//! Common test utilities and helpers
//!
//! - Fake identity verifiers and metrics sources
//! - Token and identity fixtures
//! - A mock hosted auth provider
//! - Custom assertion macros and frame helpers

pub mod assertions;
pub mod auth_helpers;
pub mod fakes;
pub mod mock_server;

// Re-export commonly used utilities
pub use assertions::*;
pub use auth_helpers::*;
pub use fakes::*;
pub use mock_server::*;
