//! Test doubles for the verifier and the metrics source.
//!
//! Compiled for unit tests and, behind the `test-util` feature, for the
//! integration suite under `tests/`.

use crate::backend::auth::IdentityVerifier;
use crate::backend::error::RealtimeError;
use crate::backend::realtime::metrics::{MetricsFigures, MetricsSource};
use crate::shared::{Activity, Identity, InventoryAlert, TransactionSummary};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Maps fixed tokens to identities
#[derive(Default)]
pub struct StaticVerifier {
    identities: HashMap<String, Identity>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, identity: Identity) -> Self {
        self.identities.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, RealtimeError> {
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| RealtimeError::auth("invalid token"))
    }
}

/// Blocks every call until released
pub struct GatedVerifier {
    identity: Identity,
    called: Notify,
    gate: Notify,
}

impl GatedVerifier {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            called: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub async fn wait_for_call(&self) {
        self.called.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl IdentityVerifier for GatedVerifier {
    async fn verify(&self, _token: &str) -> Result<Identity, RealtimeError> {
        self.called.notify_one();
        self.gate.notified().await;
        Ok(self.identity.clone())
    }
}

/// In-memory metrics source that can be switched off
///
/// The activity feed is generated on demand, so any page exists.
pub struct FakeSource {
    figures: Mutex<MetricsFigures>,
    failing: AtomicBool,
    /// Calls to `figures`, failed ones included
    pub figure_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(figures: MetricsFigures) -> Self {
        Self {
            figures: Mutex::new(figures),
            failing: AtomicBool::new(false),
            figure_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_figures(&self, figures: MetricsFigures) {
        if let Ok(mut current) = self.figures.lock() {
            *current = figures;
        }
    }

    fn check(&self) -> Result<(), RealtimeError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RealtimeError::upstream("database unreachable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetricsSource for FakeSource {
    async fn figures(&self, recent_limit: u32) -> Result<MetricsFigures, RealtimeError> {
        self.figure_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut figures = self
            .figures
            .lock()
            .map(|f| f.clone())
            .map_err(|_| RealtimeError::upstream("poisoned"))?;
        figures.recent_transactions.truncate(recent_limit as usize);
        Ok(figures)
    }

    async fn activity(&self, limit: u32, offset: u32) -> Result<Vec<Activity>, RealtimeError> {
        self.check()?;
        Ok((offset..offset.saturating_add(limit))
            .map(|i| Activity {
                id: format!("act-{}", i),
                kind: "repair".to_string(),
                description: format!("repair {} updated", i),
                actor: Some("wes".to_string()),
                occurred_at: Utc::now(),
            })
            .collect())
    }
}

/// Figures with `n` recent transactions and one low-stock alert
pub fn sample_figures(n: usize) -> MetricsFigures {
    MetricsFigures {
        today_revenue: 640.5,
        pending_repairs: 7,
        weekly_total: 3120.0,
        recent_transactions: (0..n)
            .map(|i| TransactionSummary {
                id: format!("tx-{}", i),
                customer_name: format!("customer {}", i),
                amount: 10.0 * (i as f64 + 1.0),
                status: "completed".to_string(),
                shop_id: Some("shop-1".to_string()),
                created_at: Utc::now(),
            })
            .collect(),
        inventory_alerts: vec![InventoryAlert {
            item_id: "inv-1".to_string(),
            name: "iPhone 12 screen".to_string(),
            quantity: 1,
            reorder_level: 3,
        }],
    }
}
