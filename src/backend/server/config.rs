/**
 * Server Configuration
 *
 * Everything the binary reads from its environment: listen port, database,
 * identity verification and the realtime tuning knobs.
 *
 * # Configuration Sources
 *
 * - `SERVER_PORT` (default 3000)
 * - `DATABASE_URL` (optional)
 * - `AUTH_PROVIDER_URL`, verify tokens against the hosted provider
 * - `JWT_SECRET`, verify locally signed tokens
 * - `SHOPDESK_CONFIG`, path to a TOML file with realtime settings
 * - `REALTIME_*` overrides, see `RealtimeConfig::with_overrides`
 *
 * A missing or unreachable database is logged and tolerated. A missing
 * verifier is not: without one no connection could ever authenticate.
 */

use crate::backend::auth::{HttpIdentityVerifier, IdentityVerifier, JwtIdentityVerifier};
use crate::shared::{ConfigError, RealtimeConfig};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;

/// Where identities come from
#[derive(Debug, Clone, PartialEq)]
pub enum VerifierConfig {
    /// Hosted auth provider base URL
    Provider(String),
    /// Shared HS256 secret
    Jwt(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub verifier: VerifierConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error(transparent)]
    Realtime(#[from] ConfigError),
    #[error("invalid SERVER_PORT: {0}")]
    InvalidPort(String),
    #[error("set AUTH_PROVIDER_URL or JWT_SECRET")]
    MissingVerifier,
    #[error("could not read {path}: {source}")]
    ConfigFile {
        path: String,
        source: std::io::Error,
    },
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ServerConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let verifier = match (
            non_empty(lookup("AUTH_PROVIDER_URL")),
            non_empty(lookup("JWT_SECRET")),
        ) {
            (Some(url), _) => VerifierConfig::Provider(url),
            (None, Some(secret)) => VerifierConfig::Jwt(secret),
            (None, None) => return Err(ServerConfigError::MissingVerifier),
        };

        let realtime = match non_empty(lookup("SHOPDESK_CONFIG")) {
            Some(path) => {
                let source = std::fs::read_to_string(&path)
                    .map_err(|source| ServerConfigError::ConfigFile { path, source })?;
                RealtimeConfig::from_toml_str(&source)?
            }
            None => RealtimeConfig::default(),
        }
        .with_overrides(&lookup)?;

        Ok(Self {
            port,
            database_url: non_empty(lookup("DATABASE_URL")),
            verifier,
            realtime,
        })
    }

    /// Build the configured identity verifier
    pub fn identity_verifier(&self) -> Arc<dyn IdentityVerifier> {
        match &self.verifier {
            VerifierConfig::Provider(url) => {
                tracing::info!("[Auth] Verifying tokens against {}", url);
                Arc::new(HttpIdentityVerifier::new(url.clone()))
            }
            VerifierConfig::Jwt(secret) => {
                tracing::info!("[Auth] Verifying locally signed tokens");
                Arc::new(JwtIdentityVerifier::new(secret.as_bytes()))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Connect to PostgreSQL if a URL is configured
///
/// Errors are logged and turn into `None`; the server runs without metrics
/// figures rather than refusing to start.
pub async fn load_database(database_url: Option<&str>) -> Option<PgPool> {
    let Some(url) = database_url else {
        tracing::warn!("[Server] DATABASE_URL not set. Metrics will stay at zero.");
        return None;
    };

    tracing::info!("[Server] Connecting to database...");
    match PgPool::connect(url).await {
        Ok(pool) => {
            tracing::info!("[Server] Database connection pool created");
            Some(pool)
        }
        Err(e) => {
            tracing::error!("[Server] Failed to create database connection pool: {:?}", e);
            tracing::warn!("[Server] Metrics will stay at zero.");
            None
        }
    }
}
