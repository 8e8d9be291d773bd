//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - Bearer token authentication for the polling routes

pub mod auth;

pub use auth::{auth_middleware, AuthUser, AuthenticatedUser};
