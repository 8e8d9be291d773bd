//! Authentication test helpers
//!
//! Fixture identities, signed tokens for them, and a shortcut for opening an
//! authenticated connection on a service.

use serde_json::Value;
use shopdesk::backend::auth::{create_token, JwtIdentityVerifier};
use shopdesk::backend::realtime::{ConnectionId, RealtimeService};
use shopdesk::shared::{Identity, Role};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub const TEST_SECRET: &[u8] = b"shopdesk-test-secret";

pub fn admin() -> Identity {
    Identity::new("u-admin", "ada", Role::Admin)
}

pub fn owner() -> Identity {
    Identity::new("u-owner", "oz", Role::Owner).with_tenant("shop-1")
}

pub fn worker() -> Identity {
    Identity::new("u-worker", "wes", Role::Worker).with_tenant("shop-1")
}

pub fn customer() -> Identity {
    Identity::new("u-customer", "cy", Role::from("customer"))
}

/// Signed token for an identity
pub fn token_for(identity: &Identity) -> String {
    create_token(TEST_SECRET, identity).expect("token signs")
}

pub fn jwt_verifier() -> Arc<JwtIdentityVerifier> {
    Arc::new(JwtIdentityVerifier::new(TEST_SECRET))
}

/// Open a connection for `identity`, authenticate it and return the
/// handshake frames
pub async fn connect_as(
    service: &RealtimeService,
    identity: &Identity,
) -> (ConnectionId, UnboundedReceiver<Arc<str>>, Vec<Value>) {
    let (id, mut rx) = service.on_connect().await;
    service.on_authenticate(id, &token_for(identity)).await;
    let frames = crate::common::assertions::drain(&mut rx);
    (id, rx, frames)
}
