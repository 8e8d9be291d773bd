//! Property-based tests for the role projection

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use shopdesk::shared::{
    project_for_role, BusinessMetricsSnapshot, InventoryAlert, Role, TransactionSummary,
};

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Admin),
        Just(Role::Owner),
        Just(Role::Worker),
        "[a-z]{1,12}".prop_map(Role::from),
    ]
}

fn snapshot_strategy() -> impl Strategy<Value = BusinessMetricsSnapshot> {
    (
        0.0f64..100_000.0,
        0i64..500,
        0.0f64..1_000_000.0,
        0usize..200,
        0usize..40,
        0usize..10,
        0i64..1_900_000_000,
    )
        .prop_map(|(revenue, pending, weekly, users, txs, alerts, secs)| {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            BusinessMetricsSnapshot {
                today_revenue: revenue,
                pending_repairs: pending,
                weekly_total: weekly,
                active_users: users,
                recent_transactions: (0..txs)
                    .map(|i| TransactionSummary {
                        id: format!("tx-{}", i),
                        customer_name: format!("customer {}", i),
                        amount: i as f64,
                        status: "pending".to_string(),
                        shop_id: None,
                        created_at: at,
                    })
                    .collect(),
                inventory_alerts: (0..alerts)
                    .map(|i| InventoryAlert {
                        item_id: format!("inv-{}", i),
                        name: format!("part {}", i),
                        quantity: 0,
                        reorder_level: 2,
                    })
                    .collect(),
                computed_at: at,
            }
        })
}

proptest! {
    #[test]
    fn test_projection_is_deterministic(snapshot in snapshot_strategy(), role in role_strategy()) {
        let first = project_for_role(&snapshot, &role);
        let second = project_for_role(&snapshot, &role);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        prop_assert_eq!(first.computed_at, Some(snapshot.computed_at));
    }

    #[test]
    fn test_worker_never_sees_money(snapshot in snapshot_strategy()) {
        let view = project_for_role(&snapshot, &Role::Worker);
        let json = serde_json::to_value(&view).unwrap();
        prop_assert!(json.get("todayRevenue").is_none());
        prop_assert!(json.get("weeklyTotal").is_none());
        prop_assert!(json.get("recentTransactions").is_none());
        prop_assert_eq!(view.pending_repairs, Some(snapshot.pending_repairs));
    }

    #[test]
    fn test_owner_sees_at_most_ten_transactions(snapshot in snapshot_strategy()) {
        let view = project_for_role(&snapshot, &Role::Owner);
        let visible = view.recent_transactions.unwrap();
        prop_assert_eq!(visible.len(), snapshot.recent_transactions.len().min(10));
        prop_assert_eq!(&visible[..], &snapshot.recent_transactions[..visible.len()]);
        prop_assert!(view.inventory_alerts.is_none());
    }

    #[test]
    fn test_admin_sees_everything(snapshot in snapshot_strategy()) {
        let view = project_for_role(&snapshot, &Role::Admin);
        prop_assert_eq!(view.recent_transactions.unwrap(), snapshot.recent_transactions);
        prop_assert_eq!(view.inventory_alerts.unwrap(), snapshot.inventory_alerts);
        prop_assert_eq!(view.active_users, Some(snapshot.active_users));
    }

    #[test]
    fn test_unknown_roles_see_only_presence(snapshot in snapshot_strategy(), name in "[a-z]{1,12}") {
        let role = Role::from(name);
        prop_assume!(!role.is_staff());
        let json = serde_json::to_value(project_for_role(&snapshot, &role)).unwrap();
        let mut keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        keys.sort();
        prop_assert_eq!(keys, vec!["activeUsers", "computedAt"]);
    }
}
