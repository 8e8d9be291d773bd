/**
 * Identity Verification
 *
 * Turns an opaque bearer credential into an `Identity`. Two sources are
 * supported: locally signed JWTs (`JWT_SECRET`) and the hosted auth
 * provider's `GET /user` endpoint (`AUTH_PROVIDER_URL`).
 *
 * Verifiers may be slow. Callers bound them with a timeout; the verifier
 * itself never holds any registry lock.
 */

use crate::backend::auth::sessions::verify_token;
use crate::backend::error::RealtimeError;
use crate::shared::{Identity, Role};
use async_trait::async_trait;
use serde::Deserialize;

/// Resolves a bearer credential to an identity
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, RealtimeError>;
}

/// Verifies HS256 tokens signed with a shared secret
#[derive(Clone)]
pub struct JwtIdentityVerifier {
    secret: Vec<u8>,
}

impl JwtIdentityVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for JwtIdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityVerifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, RealtimeError> {
        let claims = verify_token(&self.secret, token).map_err(|e| {
            tracing::debug!("[Auth] JWT rejected: {}", e);
            RealtimeError::auth("invalid token")
        })?;
        if claims.sub.trim().is_empty() {
            return Err(RealtimeError::auth("token has no subject"));
        }
        Ok(claims.into_identity())
    }
}

/// User record returned by the hosted auth provider
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    user_metadata: ProviderMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderMetadata {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, alias = "tenant_id", alias = "shopId")]
    shop_id: Option<String>,
}

impl ProviderUser {
    fn into_identity(self) -> Identity {
        let username = self
            .user_metadata
            .username
            .or(self.email)
            .unwrap_or_else(|| self.id.clone());
        // Provider-level roles like "authenticated" only count when the
        // application role is missing.
        let role = self
            .user_metadata
            .role
            .or(self.role)
            .map(Role::from)
            .unwrap_or_else(|| Role::Other("user".to_string()));
        let identity = Identity::new(self.id, username, role);
        match self.user_metadata.shop_id {
            Some(shop) => identity.with_tenant(shop),
            None => identity,
        }
    }
}

/// Verifies tokens against the hosted auth provider
#[derive(Debug, Clone)]
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityVerifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, RealtimeError> {
        let url = format!("{}/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("[Auth] Auth provider unreachable: {}", e);
                RealtimeError::auth("auth provider unreachable")
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RealtimeError::auth("invalid token"));
        }
        if !status.is_success() {
            tracing::warn!("[Auth] Auth provider returned {}", status);
            return Err(RealtimeError::auth(format!("auth provider returned {}", status)));
        }

        let user: ProviderUser = response.json().await.map_err(|e| {
            tracing::warn!("[Auth] Malformed auth provider response: {}", e);
            RealtimeError::auth("malformed auth provider response")
        })?;
        Ok(user.into_identity())
    }
}
