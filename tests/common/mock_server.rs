//! Mock server helpers for integration tests
//!
//! A stand-in for the hosted auth provider: `GET /user` answers with the
//! user registered for the bearer token, or 401.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Users the mock provider knows, keyed by access token
#[derive(Default, Clone)]
pub struct MockAuthProvider {
    users: HashMap<String, Value>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: Value) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }

    /// Serve on an ephemeral local port and return the base URL
    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route("/auth/v1/user", get(current_user))
            .with_state(Arc::new(self));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/auth/v1", addr)
    }
}

async fn current_user(
    State(provider): State<Arc<MockAuthProvider>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| provider.users.get(token).cloned())
        .map(Json)
        .ok_or(StatusCode::UNAUTHORIZED)
}
