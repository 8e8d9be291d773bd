//! Server Module
//!
//! Initialization and configuration of the Axum HTTP server.
//!
//! # Architecture
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Environment configuration and database loading
//! - **`init`** - Service construction, router and background tasks
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: port, verifier, database URL, realtime knobs
//! 2. **State Creation**: realtime service and domain event queue
//! 3. **Background Tasks**: metrics ticker and domain event consumer
//! 4. **Router Creation**: WebSocket, health and polling routes

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::{load_database, ServerConfig, ServerConfigError, VerifierConfig};
pub use init::{assemble, create_app, App};
pub use state::AppState;
