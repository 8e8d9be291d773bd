/**
 * Real-time Event System
 *
 * Domain events raised by the CRUD layer after a successful write. Each event
 * has a closed kind, an opaque JSON payload and optional routing hints. The
 * timestamp is taken when the event is constructed so that fan-out jitter
 * never reorders two events from the same broadcast.
 */
use crate::shared::error::SharedError;
use crate::shared::identity::Role;
use crate::shared::protocol::{EventEnvelope, ServerMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of domain event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Transaction created or updated
    Transaction,
    /// Stock level changed
    Inventory,
    /// Notification issued to a user or role
    Notification,
    /// User went online/offline
    UserStatus,
}

impl EventKind {
    /// Wire name, matches the `type` tag of the server message it produces
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction_update",
            Self::Inventory => "inventory_update",
            Self::Notification => "new_notification",
            Self::UserStatus => "user_status_update",
        }
    }
}

/// Real-time event routed to a subset of connections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    /// Kind of event
    pub kind: EventKind,
    /// Event payload (JSON-serializable data)
    pub data: serde_json::Value,
    /// When the event was constructed
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Notification target user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    /// Notification target role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<Role>,
    /// Shop the event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
}

impl RealtimeEvent {
    /// Create a new real-time event stamped with the current time
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
            target_user_id: None,
            target_role: None,
            shop_id: None,
        }
    }

    /// Create a transaction event
    pub fn transaction(data: serde_json::Value) -> Self {
        Self::new(EventKind::Transaction, data)
    }

    /// Create an inventory event
    pub fn inventory(data: serde_json::Value) -> Self {
        Self::new(EventKind::Inventory, data)
    }

    /// Create a notification event for a user and/or a role
    pub fn notification(
        data: serde_json::Value,
        target_user_id: Option<String>,
        target_role: Option<Role>,
    ) -> Self {
        Self {
            target_user_id,
            target_role,
            ..Self::new(EventKind::Notification, data)
        }
    }

    /// Create a user status event
    pub fn user_status(user_id: &str, username: &str, status: &str) -> Self {
        Self::new(
            EventKind::UserStatus,
            serde_json::json!({
                "userId": user_id,
                "username": username,
                "status": status,
            }),
        )
    }

    /// Scope the event to a shop
    pub fn with_shop(mut self, shop_id: impl Into<String>) -> Self {
        self.shop_id = Some(shop_id.into());
        self
    }

    /// Check routing hints before the event is queued
    ///
    /// A notification with neither a target user nor a target role would
    /// reach nobody.
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.kind == EventKind::Notification
            && self.target_user_id.is_none()
            && self.target_role.is_none()
        {
            return Err(SharedError::validation(
                "targetUserId",
                "notification needs a target user or a target role",
            ));
        }
        if let Some(user_id) = &self.target_user_id {
            if user_id.trim().is_empty() {
                return Err(SharedError::validation("targetUserId", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Wire message delivered to clients
    pub fn to_server_message(&self) -> ServerMessage {
        let envelope = EventEnvelope {
            data: self.data.clone(),
            timestamp: self.timestamp,
        };
        match self.kind {
            EventKind::Transaction => ServerMessage::TransactionUpdate(envelope),
            EventKind::Inventory => ServerMessage::InventoryUpdate(envelope),
            EventKind::Notification => ServerMessage::NewNotification(envelope),
            EventKind::UserStatus => ServerMessage::UserStatusUpdate(envelope),
        }
    }
}
