//! Routes Module
//!
//! HTTP route configuration for the backend server.
//!
//! - **`router`** - Main router assembly, `/ws` and `/health`
//! - **`api_routes`** - Polling fallback and domain event ingestion
//!
//! # Dependencies
//!
//! - `backend::server::state` - Application state
//! - `backend::realtime` - WebSocket transport and realtime service
//! - `backend::middleware` - Bearer token authentication

/// Main router creation
pub mod router;

/// API endpoint handlers
pub mod api_routes;

// Re-export commonly used functions
pub use router::create_router;
