/**
 * Authentication Middleware
 *
 * Protects the polling fallback routes. The bearer token from the
 * Authorization header is checked by the same `IdentityVerifier` that
 * WebSocket connections authenticate against, and the resulting identity is
 * attached to the request extensions.
 */

use crate::backend::error::{BackendError, RealtimeError};
use crate::backend::realtime::RealtimeService;
use crate::shared::Identity;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Identity attached to the request by [`auth_middleware`]
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatedUser(pub Identity);

/// Authentication middleware
///
/// 1. Extracts the bearer token from the Authorization header
/// 2. Verifies it, bounded by the configured auth timeout
/// 3. Attaches the identity to request extensions
///
/// Responds 401 when the token is missing or invalid and 502 when the
/// identity provider cannot be reached.
pub async fn auth_middleware(
    State(service): State<Arc<RealtimeService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!("[Auth] Missing Authorization header");
            RealtimeError::auth("missing bearer token")
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            tracing::debug!("[Auth] Invalid Authorization header format");
            RealtimeError::auth("missing bearer token")
        })?;

    let verifier = service.verifier();
    let identity = tokio::time::timeout(service.config().auth_timeout(), verifier.verify(token))
        .await
        .map_err(|_| RealtimeError::auth("verification timed out"))??;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(identity));

    Ok(next.run(request).await)
}

/// Axum extractor for the authenticated user
#[derive(Clone, Debug)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    /// Reject roles outside admin, owner and worker
    pub fn require_staff(&self) -> Result<&Identity, BackendError> {
        if self.0.role.is_staff() {
            Ok(&self.0)
        } else {
            Err(RealtimeError::permission("staff only").into())
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|user| AuthUser(user.0.clone()))
            .ok_or_else(|| {
                tracing::warn!("[Auth] AuthenticatedUser not found in request extensions");
                RealtimeError::auth("authenticate first").into()
            })
    }
}
