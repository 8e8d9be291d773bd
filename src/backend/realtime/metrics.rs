/**
 * Metrics Aggregator
 *
 * Pulls business figures from the data-access layer and caches them as an
 * immutable snapshot. A refresh builds a complete new snapshot and swaps it
 * in; readers keep whatever snapshot they already loaded.
 *
 * A failing or slow data source never surfaces to clients on the periodic
 * path. The previous snapshot keeps being served and the failure is logged.
 */

use crate::backend::error::RealtimeError;
use crate::shared::{
    project_for_role, Activity, BusinessMetricsSnapshot, InventoryAlert, RealtimeConfig, Role,
    RoleMetricsView, TransactionSummary,
};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Raw figures as returned by the data-access layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsFigures {
    pub today_revenue: f64,
    pub pending_repairs: i64,
    pub weekly_total: f64,
    pub recent_transactions: Vec<TransactionSummary>,
    pub inventory_alerts: Vec<InventoryAlert>,
}

/// Data-access facade used by the aggregator
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Current aggregate figures with at most `recent_limit` recent transactions
    async fn figures(&self, recent_limit: u32) -> Result<MetricsFigures, RealtimeError>;

    /// Page of the activity feed, newest first
    async fn activity(&self, limit: u32, offset: u32) -> Result<Vec<Activity>, RealtimeError>;
}

/// Caches the latest business metrics snapshot
pub struct MetricsAggregator {
    source: Option<Arc<dyn MetricsSource>>,
    snapshot: ArcSwap<BusinessMetricsSnapshot>,
    config: RealtimeConfig,
}

impl MetricsAggregator {
    /// Start with an all-zero snapshot stamped now
    pub fn new(source: Option<Arc<dyn MetricsSource>>, config: RealtimeConfig) -> Self {
        Self {
            source,
            snapshot: ArcSwap::from_pointee(BusinessMetricsSnapshot::empty(Utc::now())),
            config,
        }
    }

    /// Cached snapshot, no I/O
    pub fn current(&self) -> Arc<BusinessMetricsSnapshot> {
        self.snapshot.load_full()
    }

    /// Role projection of the cached snapshot
    ///
    /// `active_users` is the live connection count. It replaces the figure
    /// stored at the last successful refresh; everything else stays as cached.
    pub fn view_for(&self, role: &Role, active_users: usize) -> RoleMetricsView {
        project_for_role(&self.current(), role).with_active_users(active_users)
    }

    /// Alerts from the cached snapshot
    pub fn inventory_alerts(&self) -> Vec<InventoryAlert> {
        self.current().inventory_alerts.clone()
    }

    /// Rebuild the snapshot, or keep the previous one if the source fails
    pub async fn refresh(&self, active_users: usize) -> Arc<BusinessMetricsSnapshot> {
        match self.try_refresh(active_users).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if self.source.is_some() {
                    tracing::warn!("[Metrics] Refresh failed, serving previous snapshot: {}", e);
                } else {
                    tracing::debug!("[Metrics] {}", e);
                }
                self.current()
            }
        }
    }

    /// Rebuild the snapshot, reporting source failures
    pub async fn try_refresh(
        &self,
        active_users: usize,
    ) -> Result<Arc<BusinessMetricsSnapshot>, RealtimeError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| RealtimeError::upstream("no metrics source configured"))?;

        let figures = bounded(
            self.config.refresh_timeout(),
            source.figures(self.config.snapshot_recent_limit),
        )
        .await?;

        let snapshot = Arc::new(BusinessMetricsSnapshot {
            today_revenue: figures.today_revenue,
            pending_repairs: figures.pending_repairs,
            weekly_total: figures.weekly_total,
            active_users,
            recent_transactions: figures.recent_transactions,
            inventory_alerts: figures.inventory_alerts,
            computed_at: Utc::now(),
        });
        self.snapshot.store(snapshot.clone());
        tracing::debug!(
            active_users,
            pending_repairs = snapshot.pending_repairs,
            "[Metrics] Snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// Page of the activity feed. `limit` is clamped to the configured range.
    pub async fn activity_feed(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Activity>, RealtimeError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| RealtimeError::upstream("no metrics source configured"))?;
        let limit = self.config.clamp_activity_limit(limit);
        bounded(
            self.config.refresh_timeout(),
            source.activity(limit, offset.unwrap_or(0)),
        )
        .await
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RealtimeError>
where
    F: std::future::Future<Output = Result<T, RealtimeError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(RealtimeError::upstream("data source timed out")))
}
