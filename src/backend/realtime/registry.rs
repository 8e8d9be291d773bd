/**
 * Connection Registry
 *
 * In-memory table of live connections and the broadcast groups derived from
 * their identities. Connections and group membership sit behind a single
 * lock so a broadcast never observes a connection that is in the table but
 * missing from its groups, or the other way round.
 *
 * # Authentication phases
 *
 * ```text
 * Unauthenticated --authenticate--> Authenticating --ok--> Authenticated
 *        ^                                 |
 *        +-------------- error ------------+
 * ```
 *
 * The verifier runs with the lock released. If the connection is removed in
 * the meantime the verifier result is dropped on the floor.
 */

use crate::backend::auth::IdentityVerifier;
use crate::backend::error::RealtimeError;
use crate::backend::realtime::groups::{GroupKey, Topic};
use crate::shared::{ActiveUser, Identity, Role};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Opaque per-session handle
pub type ConnectionId = Uuid;

/// Outbound queue of a connection. Frames are serialized once and shared.
pub type ConnectionSender = mpsc::UnboundedSender<Arc<str>>;

/// Authentication phase of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(Identity),
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Point-in-time view of one group member
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub role: Role,
    pub sender: ConnectionSender,
}

/// Narrows a group to some roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFilter {
    Any,
    /// Admins and owners only
    Privileged,
}

impl RoleFilter {
    pub fn admits(&self, role: &Role) -> bool {
        match self {
            Self::Any => true,
            Self::Privileged => role.is_privileged(),
        }
    }
}

/// What was removed by [`ConnectionRegistry::remove`]
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedConnection {
    pub id: ConnectionId,
    pub identity: Option<Identity>,
    pub groups: Vec<GroupKey>,
}

#[derive(Debug)]
struct Entry {
    sender: ConnectionSender,
    state: AuthState,
    groups: HashSet<GroupKey>,
}

#[derive(Debug, Default)]
struct Inner {
    connections: HashMap<ConnectionId, Entry>,
    groups: HashMap<GroupKey, HashSet<ConnectionId>>,
}

impl Inner {
    fn join(&mut self, id: ConnectionId, key: GroupKey) -> bool {
        let Some(entry) = self.connections.get_mut(&id) else {
            return false;
        };
        if !entry.groups.insert(key.clone()) {
            return false;
        }
        self.groups.entry(key).or_default().insert(id);
        true
    }

    fn recipient(&self, id: &ConnectionId) -> Option<Recipient> {
        let entry = self.connections.get(id)?;
        let identity = entry.state.identity()?;
        Some(Recipient {
            id: *id,
            role: identity.role.clone(),
            sender: entry.sender.clone(),
        })
    }
}

/// Registry of live connections and their group memberships
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an unauthenticated connection. No-op if already registered.
    pub async fn register(&self, id: ConnectionId, sender: ConnectionSender) {
        let mut inner = self.inner.write().await;
        inner.connections.entry(id).or_insert_with(|| Entry {
            sender,
            state: AuthState::Unauthenticated,
            groups: HashSet::new(),
        });
    }

    /// Resolve `token` and attach the identity to the connection.
    ///
    /// On success the connection joins its role, user and shop groups in the
    /// same critical section that stores the identity.
    pub async fn authenticate(
        &self,
        id: ConnectionId,
        token: &str,
        verifier: &dyn IdentityVerifier,
        timeout: Duration,
    ) -> Result<Identity, RealtimeError> {
        self.begin_authentication(id).await?;

        let outcome = match tokio::time::timeout(timeout, verifier.verify(token)).await {
            Ok(result) => result,
            Err(_) => Err(RealtimeError::auth("verification timed out")),
        };

        self.complete_authentication(id, outcome).await
    }

    async fn begin_authentication(&self, id: ConnectionId) -> Result<(), RealtimeError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .connections
            .get_mut(&id)
            .ok_or_else(|| RealtimeError::auth("connection closed"))?;
        match entry.state {
            AuthState::Unauthenticated => {
                entry.state = AuthState::Authenticating;
                Ok(())
            }
            AuthState::Authenticating => Err(RealtimeError::auth("already authenticating")),
            AuthState::Authenticated(_) => Err(RealtimeError::auth("already authenticated")),
        }
    }

    async fn complete_authentication(
        &self,
        id: ConnectionId,
        outcome: Result<Identity, RealtimeError>,
    ) -> Result<Identity, RealtimeError> {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.connections.get_mut(&id) else {
            return Err(RealtimeError::auth("connection closed"));
        };

        match outcome {
            Ok(identity) => {
                entry.state = AuthState::Authenticated(identity.clone());
                for key in GroupKey::automatic_for(&identity) {
                    inner.join(id, key);
                }
                Ok(identity)
            }
            Err(err) => {
                entry.state = AuthState::Unauthenticated;
                Err(err)
            }
        }
    }

    /// Join an opt-in topic. Joining the same topic twice is a no-op.
    pub async fn join_topic(&self, id: ConnectionId, raw: &str) -> Result<Topic, RealtimeError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .connections
            .get(&id)
            .ok_or_else(|| RealtimeError::auth("connection closed"))?;
        let identity = entry
            .state
            .identity()
            .ok_or_else(|| RealtimeError::permission("authenticate before subscribing"))?;

        let topic = Topic::resolve(raw, identity)?;
        inner.join(id, GroupKey::Topic(topic.clone()));
        Ok(topic)
    }

    /// Drop a connection and all its memberships. Idempotent.
    pub async fn remove(&self, id: ConnectionId) -> Option<RemovedConnection> {
        let mut inner = self.inner.write().await;
        let entry = inner.connections.remove(&id)?;
        for key in &entry.groups {
            if let Some(members) = inner.groups.get_mut(key) {
                members.remove(&id);
                if members.is_empty() {
                    inner.groups.remove(key);
                }
            }
        }
        Some(RemovedConnection {
            id,
            identity: entry.state.identity().cloned(),
            groups: entry.groups.into_iter().collect(),
        })
    }

    /// Members of a single group
    pub async fn members_of(&self, key: &GroupKey) -> Vec<Recipient> {
        self.members_of_any(std::slice::from_ref(key)).await
    }

    /// Union of several groups, one entry per connection
    pub async fn members_of_any(&self, keys: &[GroupKey]) -> Vec<Recipient> {
        let selectors: Vec<(GroupKey, RoleFilter)> =
            keys.iter().map(|key| (key.clone(), RoleFilter::Any)).collect();
        self.members_filtered(&selectors).await
    }

    /// Union of several groups, each narrowed by its own role filter
    pub async fn members_filtered(&self, selectors: &[(GroupKey, RoleFilter)]) -> Vec<Recipient> {
        let inner = self.inner.read().await;
        let mut seen = HashSet::new();
        let mut recipients = Vec::new();
        for (key, filter) in selectors {
            let Some(members) = inner.groups.get(key) else {
                continue;
            };
            for id in members {
                if seen.contains(id) {
                    continue;
                }
                if let Some(recipient) = inner.recipient(id) {
                    if filter.admits(&recipient.role) {
                        seen.insert(*id);
                        recipients.push(recipient);
                    }
                }
            }
        }
        recipients
    }

    /// Every authenticated connection
    pub async fn authenticated(&self) -> Vec<Recipient> {
        let inner = self.inner.read().await;
        inner
            .connections
            .keys()
            .filter_map(|id| inner.recipient(id))
            .collect()
    }

    /// Outbound queue of any registered connection
    pub async fn sender_of(&self, id: ConnectionId) -> Option<ConnectionSender> {
        let inner = self.inner.read().await;
        inner.connections.get(&id).map(|entry| entry.sender.clone())
    }

    pub async fn state_of(&self, id: ConnectionId) -> Option<AuthState> {
        let inner = self.inner.read().await;
        inner.connections.get(&id).map(|entry| entry.state.clone())
    }

    pub async fn identity_of(&self, id: ConnectionId) -> Option<Identity> {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(&id)
            .and_then(|entry| entry.state.identity().cloned())
    }

    pub async fn groups_of(&self, id: ConnectionId) -> Vec<GroupKey> {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(&id)
            .map(|entry| entry.groups.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of authenticated connections
    pub async fn count(&self) -> usize {
        let inner = self.inner.read().await;
        inner
            .connections
            .values()
            .filter(|entry| entry.state.identity().is_some())
            .count()
    }

    /// Number of registered connections, authenticated or not
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Size of a group, zero when it does not exist
    pub async fn group_size(&self, key: &GroupKey) -> usize {
        let inner = self.inner.read().await;
        inner.groups.get(key).map(HashSet::len).unwrap_or(0)
    }

    pub async fn is_user_connected(&self, user_id: &str) -> bool {
        self.group_size(&GroupKey::user(user_id)).await > 0
    }

    /// Distinct authenticated users, ordered by user id
    pub async fn active_users(&self) -> Vec<ActiveUser> {
        let inner = self.inner.read().await;
        let mut users: BTreeMap<&str, ActiveUser> = BTreeMap::new();
        for identity in inner.connections.values().filter_map(|e| e.state.identity()) {
            users
                .entry(identity.user_id.as_str())
                .and_modify(|user| user.connections += 1)
                .or_insert_with(|| ActiveUser {
                    user_id: identity.user_id.clone(),
                    username: identity.username.clone(),
                    role: identity.role.clone(),
                    connections: 1,
                });
        }
        users.into_values().collect()
    }
}
