/**
 * Session Tokens
 *
 * HS256 JWTs carrying the staff member's identity. Tokens are issued by the
 * back-office login flow; this service only needs to decode them, but the
 * issuing half is kept for tooling and tests.
 */

use crate::shared::{Identity, Role};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Tokens are valid for 30 days
pub const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Display name
    pub username: String,
    /// Staff role (`admin`, `owner`, `worker`, ...)
    pub role: String,
    /// Shop the user belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

impl Claims {
    /// Build claims for an identity, expiring `ttl_secs` from now
    pub fn for_identity(identity: &Identity, ttl_secs: u64) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        Self {
            sub: identity.user_id.clone(),
            username: identity.username.clone(),
            role: identity.role.as_str().to_string(),
            shop_id: identity.tenant_id.clone(),
            exp: now + ttl_secs,
            iat: now,
        }
    }

    /// Resolved identity carried by the token
    pub fn into_identity(self) -> Identity {
        let identity = Identity::new(self.sub, self.username, Role::from(self.role));
        match self.shop_id {
            Some(shop) => identity.with_tenant(shop),
            None => identity,
        }
    }
}

/// Create a signed token for an identity
pub fn create_token(
    secret: &[u8],
    identity: &Identity,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::for_identity(identity, TOKEN_TTL_SECS);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Verify and decode a token
pub fn verify_token(secret: &[u8], token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
