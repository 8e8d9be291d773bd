/**
 * PostgreSQL Metrics Source
 *
 * Read-only queries against the back-office tables. The tables belong to the
 * CRUD layer; this module never writes.
 *
 * Sums are cast to `float8` so they decode straight into `f64`.
 */

use crate::backend::error::RealtimeError;
use crate::backend::realtime::metrics::{MetricsFigures, MetricsSource};
use crate::shared::{Activity, InventoryAlert, TransactionSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Metrics source backed by the shop database
#[derive(Debug, Clone)]
pub struct PgMetricsSource {
    pool: PgPool,
}

impl PgMetricsSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Totals {
    today_revenue: f64,
    weekly_total: f64,
    pending_repairs: i64,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    customer_name: String,
    amount: f64,
    status: String,
    shop_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    item_id: String,
    name: String,
    quantity: i64,
    reorder_level: i64,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    kind: String,
    description: String,
    actor: Option<String>,
    occurred_at: DateTime<Utc>,
}

fn upstream(e: sqlx::Error) -> RealtimeError {
    RealtimeError::upstream(format!("database error: {}", e))
}

#[async_trait]
impl MetricsSource for PgMetricsSource {
    async fn figures(&self, recent_limit: u32) -> Result<MetricsFigures, RealtimeError> {
        let totals = sqlx::query_as::<_, Totals>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (
                    WHERE status = 'completed' AND created_at >= date_trunc('day', NOW())
                ), 0)::float8 AS today_revenue,
                COALESCE(SUM(amount) FILTER (
                    WHERE status = 'completed' AND created_at >= NOW() - INTERVAL '7 days'
                ), 0)::float8 AS weekly_total,
                COUNT(*) FILTER (
                    WHERE transaction_type = 'repair' AND status IN ('pending', 'in_progress')
                ) AS pending_repairs
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(upstream)?;

        let recent = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id::text AS id, customer_name, amount::float8 AS amount, status,
                   shop_id::text AS shop_id, created_at
            FROM transactions
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(recent_limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(upstream)?;

        let alerts = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id::text AS item_id, name, quantity::int8 AS quantity,
                   reorder_level::int8 AS reorder_level
            FROM inventory_items
            WHERE quantity <= reorder_level
            ORDER BY quantity ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(upstream)?;

        Ok(MetricsFigures {
            today_revenue: totals.today_revenue,
            pending_repairs: totals.pending_repairs,
            weekly_total: totals.weekly_total,
            recent_transactions: recent
                .into_iter()
                .map(|row| TransactionSummary {
                    id: row.id,
                    customer_name: row.customer_name,
                    amount: row.amount,
                    status: row.status,
                    shop_id: row.shop_id,
                    created_at: row.created_at,
                })
                .collect(),
            inventory_alerts: alerts
                .into_iter()
                .map(|row| InventoryAlert {
                    item_id: row.item_id,
                    name: row.name,
                    quantity: row.quantity,
                    reorder_level: row.reorder_level,
                })
                .collect(),
        })
    }

    async fn activity(&self, limit: u32, offset: u32) -> Result<Vec<Activity>, RealtimeError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id::text AS id, kind, description, actor, created_at AS occurred_at
            FROM activity_log
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(upstream)?;

        Ok(rows
            .into_iter()
            .map(|row| Activity {
                id: row.id,
                kind: row.kind,
                description: row.description,
                actor: row.actor,
                occurred_at: row.occurred_at,
            })
            .collect())
    }
}
