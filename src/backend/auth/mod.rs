//! Authentication Module
//!
//! Resolves bearer credentials to identities for the realtime handshake and
//! the polling endpoints.
//!
//! - **`sessions`** - JWT claims, token signing and validation
//! - **`verifier`** - `IdentityVerifier` trait with JWT and hosted-provider
//!   implementations
//!
//! The verifier is injected into the realtime service and the auth
//! middleware as an `Arc<dyn IdentityVerifier>`, so tests can swap in a fake.

/// JWT token generation and validation
pub mod sessions;

/// Bearer credential verification
pub mod verifier;

pub use sessions::{create_token, verify_token, Claims};
pub use verifier::{HttpIdentityVerifier, IdentityVerifier, JwtIdentityVerifier};
