//! Business Metrics
//!
//! The aggregate figures pushed to dashboards on every tick, and the
//! least-privilege projection each role is allowed to see.
//!
//! A snapshot is immutable once built. The aggregator swaps the whole value
//! on refresh and readers project from whichever snapshot they loaded.

use crate::shared::identity::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owners see at most this many recent transactions
pub const OWNER_RECENT_TRANSACTION_LIMIT: usize = 10;

/// One row of the recent-transactions list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: String,
    pub customer_name: String,
    pub amount: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Item at or below its reorder level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAlert {
    pub item_id: String,
    pub name: String,
    pub quantity: i64,
    pub reorder_level: i64,
}

/// Entry of the recent-activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub kind: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Distinct authenticated user, as listed to privileged roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    /// Number of open connections for this user
    pub connections: usize,
}

/// Point-in-time aggregate of business metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetricsSnapshot {
    pub today_revenue: f64,
    pub pending_repairs: i64,
    pub weekly_total: f64,
    pub active_users: usize,
    pub recent_transactions: Vec<TransactionSummary>,
    pub inventory_alerts: Vec<InventoryAlert>,
    pub computed_at: DateTime<Utc>,
}

impl BusinessMetricsSnapshot {
    /// All-zero snapshot served until the first successful refresh
    pub fn empty(computed_at: DateTime<Utc>) -> Self {
        Self {
            today_revenue: 0.0,
            pending_repairs: 0,
            weekly_total: 0.0,
            active_users: 0,
            recent_transactions: Vec::new(),
            inventory_alerts: Vec::new(),
            computed_at,
        }
    }
}

/// Role-filtered view of a snapshot
///
/// Fields a role may not see are `None` and are left out of the JSON
/// entirely. `computed_at` is always present so clients can tell a fresh
/// view from a stale one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMetricsView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_repairs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_users: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_transactions: Option<Vec<TransactionSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_alerts: Option<Vec<InventoryAlert>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_at: Option<DateTime<Utc>>,
}

impl RoleMetricsView {
    /// Replace the presence figure with a live count, if this view shows one
    pub fn with_active_users(mut self, count: usize) -> Self {
        if let Some(active) = self.active_users.as_mut() {
            *active = count;
        }
        self
    }
}

/// Project a snapshot down to what `role` is entitled to see.
///
/// - `admin`: everything
/// - `owner`: revenue, pending repairs, weekly total, active users and the
///   first ten recent transactions
/// - `worker`: pending repairs and inventory alerts
/// - anything else: active users
pub fn project_for_role(snapshot: &BusinessMetricsSnapshot, role: &Role) -> RoleMetricsView {
    let base = RoleMetricsView {
        computed_at: Some(snapshot.computed_at),
        ..RoleMetricsView::default()
    };

    match role {
        Role::Admin => RoleMetricsView {
            today_revenue: Some(snapshot.today_revenue),
            pending_repairs: Some(snapshot.pending_repairs),
            weekly_total: Some(snapshot.weekly_total),
            active_users: Some(snapshot.active_users),
            recent_transactions: Some(snapshot.recent_transactions.clone()),
            inventory_alerts: Some(snapshot.inventory_alerts.clone()),
            ..base
        },
        Role::Owner => RoleMetricsView {
            today_revenue: Some(snapshot.today_revenue),
            pending_repairs: Some(snapshot.pending_repairs),
            weekly_total: Some(snapshot.weekly_total),
            active_users: Some(snapshot.active_users),
            recent_transactions: Some(
                snapshot
                    .recent_transactions
                    .iter()
                    .take(OWNER_RECENT_TRANSACTION_LIMIT)
                    .cloned()
                    .collect(),
            ),
            ..base
        },
        Role::Worker => RoleMetricsView {
            pending_repairs: Some(snapshot.pending_repairs),
            inventory_alerts: Some(snapshot.inventory_alerts.clone()),
            ..base
        },
        Role::Other(_) => RoleMetricsView {
            active_users: Some(snapshot.active_users),
            ..base
        },
    }
}
