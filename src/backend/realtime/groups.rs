//! Broadcast group keys and topic entitlements.
//!
//! Every authenticated connection is placed in `role:<role>`, `user:<id>`
//! and, when it has a tenant, `shop:<tenant>`. Topic groups are opt-in and
//! only joined through an explicit subscribe.

use crate::backend::error::RealtimeError;
use crate::shared::{Identity, Role};
use std::fmt;

pub const INVENTORY_ALERTS: &str = "inventory_alerts";
pub const TRANSACTIONS: &str = "transactions";
pub const NOTIFICATIONS: &str = "notifications";

/// Opt-in topic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    InventoryAlerts,
    Transactions,
    /// Personal notification stream of one user
    Notifications(String),
}

impl Topic {
    /// Parse a topic name and check that `identity` may join it.
    ///
    /// Bare `notifications` means the caller's own stream.
    pub fn resolve(raw: &str, identity: &Identity) -> Result<Self, RealtimeError> {
        let topic = match raw.trim() {
            INVENTORY_ALERTS => Self::InventoryAlerts,
            TRANSACTIONS => Self::Transactions,
            NOTIFICATIONS => Self::Notifications(identity.user_id.clone()),
            other => match other.strip_prefix("notifications:") {
                Some(user_id) if !user_id.is_empty() => Self::Notifications(user_id.to_string()),
                _ => return Err(RealtimeError::permission("unknown topic")),
            },
        };
        topic.authorize(identity)?;
        Ok(topic)
    }

    fn authorize(&self, identity: &Identity) -> Result<(), RealtimeError> {
        match self {
            Self::InventoryAlerts | Self::Transactions => {
                if identity.role.is_staff() {
                    Ok(())
                } else {
                    Err(RealtimeError::permission(format!(
                        "role '{}' may not subscribe to {}",
                        identity.role, self
                    )))
                }
            }
            Self::Notifications(user_id) => {
                if *user_id == identity.user_id || identity.role == Role::Admin {
                    Ok(())
                } else {
                    Err(RealtimeError::permission(
                        "notifications of another user are admin only",
                    ))
                }
            }
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InventoryAlerts => f.write_str(INVENTORY_ALERTS),
            Self::Transactions => f.write_str(TRANSACTIONS),
            Self::Notifications(user_id) => write!(f, "{}:{}", NOTIFICATIONS, user_id),
        }
    }
}

/// Key of a broadcast group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Role(Role),
    User(String),
    Shop(String),
    Topic(Topic),
}

impl GroupKey {
    pub fn role(role: Role) -> Self {
        Self::Role(role)
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User(user_id.into())
    }

    pub fn shop(shop_id: impl Into<String>) -> Self {
        Self::Shop(shop_id.into())
    }

    /// `role:admin` and `role:owner`
    pub fn privileged() -> [Self; 2] {
        [Self::Role(Role::Admin), Self::Role(Role::Owner)]
    }

    /// Groups joined automatically on successful authentication
    pub fn automatic_for(identity: &Identity) -> Vec<Self> {
        let mut keys = vec![
            Self::Role(identity.role.clone()),
            Self::User(identity.user_id.clone()),
        ];
        if let Some(tenant) = &identity.tenant_id {
            keys.push(Self::Shop(tenant.clone()));
        }
        keys
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "role:{}", role),
            Self::User(id) => write!(f, "user:{}", id),
            Self::Shop(id) => write!(f, "shop:{}", id),
            Self::Topic(topic) => topic.fmt(f),
        }
    }
}

impl From<Topic> for GroupKey {
    fn from(topic: Topic) -> Self {
        Self::Topic(topic)
    }
}
