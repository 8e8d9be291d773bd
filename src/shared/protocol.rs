//! WebSocket protocol message types.
//!
//! Defines the JSON message format for client-server communication. Every
//! frame is a JSON object with a snake_case `type` discriminator.

use crate::shared::error::SharedError;
use crate::shared::identity::Identity;
use crate::shared::metrics::{ActiveUser, Activity, RoleMetricsView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Client → Server Messages
// ============================================================================

/// Message sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Present a bearer credential. Allowed once per connection.
    Authenticate { token: String },
    /// Join an opt-in topic group (e.g. `inventory_alerts`).
    SubscribeTopic { topic: String },
    /// Ask for the current role-filtered metrics.
    RequestMetrics,
    /// Ask for a page of the recent-activity feed.
    RequestActivityFeed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<u32>,
    },
    /// Keepalive.
    Ping,
}

impl ClientMessage {
    /// Parse a text frame.
    pub fn from_json(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::SubscribeTopic { .. } => "subscribe_topic",
            Self::RequestMetrics => "request_metrics",
            Self::RequestActivityFeed { .. } => "request_activity_feed",
            Self::Ping => "ping",
        }
    }
}

// ============================================================================
// Server → Client Messages
// ============================================================================

/// Payload and construction time of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Message sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication succeeded.
    Authenticated { user: Identity },
    /// Authentication failed; the connection stays open.
    AuthError { message: String },
    /// Role-filtered metrics snapshot.
    MetricsUpdate(RoleMetricsView),
    /// Page of recent activity.
    ActivityFeed { activities: Vec<Activity> },
    /// Active user telemetry. `users` is only filled for privileged roles.
    ActiveUsersUpdate {
        count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        users: Option<Vec<ActiveUser>>,
    },
    /// Transaction created or updated.
    TransactionUpdate(EventEnvelope),
    /// Inventory changed.
    InventoryUpdate(EventEnvelope),
    /// Notification for this user or role.
    NewNotification(EventEnvelope),
    /// Another user went online or offline.
    UserStatusUpdate(EventEnvelope),
    /// Topic subscription confirmed.
    Subscribed { topic: String },
    /// Typed error reported to this connection only.
    Error { code: String, message: String },
    /// Reply to `ping`.
    Pong { timestamp: DateTime<Utc> },
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Wire `type` tag, used in logs and for per-type ordering checks.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AuthError { .. } => "auth_error",
            Self::MetricsUpdate(_) => "metrics_update",
            Self::ActivityFeed { .. } => "activity_feed",
            Self::ActiveUsersUpdate { .. } => "active_users_update",
            Self::TransactionUpdate(_) => "transaction_update",
            Self::InventoryUpdate(_) => "inventory_update",
            Self::NewNotification(_) => "new_notification",
            Self::UserStatusUpdate(_) => "user_status_update",
            Self::Subscribed { .. } => "subscribed",
            Self::Error { .. } => "error",
            Self::Pong { .. } => "pong",
        }
    }
}
