/**
 * Realtime Service
 *
 * Orchestrates the connection lifecycle on top of the registry, the
 * broadcast engine and the metrics aggregator:
 *
 * ```text
 * Connecting -> Unauthenticated -> Authenticated -> Closed
 * ```
 *
 * Client messages are handled one at a time per connection. Domain events
 * and the periodic tick arrive from their own tasks and only share the
 * registry and the engine with the per-connection workers.
 *
 * Errors caused by a client are reported to that client as typed frames.
 * Nothing here closes a socket; dead queues are reaped after each fan-out.
 */

use crate::backend::auth::IdentityVerifier;
use crate::backend::realtime::broadcast::{BroadcastEngine, DeliveryReport};
use crate::backend::realtime::groups::{GroupKey, Topic};
use crate::backend::realtime::metrics::{MetricsAggregator, MetricsSource};
use crate::backend::realtime::registry::{
    ConnectionId, ConnectionRegistry, Recipient, RemovedConnection, RoleFilter,
};
use crate::shared::{
    project_for_role, ClientMessage, EventEnvelope, EventKind, Identity, RealtimeConfig,
    RealtimeEvent, Role, RoleMetricsView, ServerMessage, SharedError,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Realtime presence and metrics service
pub struct RealtimeService {
    registry: Arc<ConnectionRegistry>,
    engine: BroadcastEngine,
    metrics: MetricsAggregator,
    verifier: Arc<dyn IdentityVerifier>,
    config: RealtimeConfig,
}

impl RealtimeService {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        source: Option<Arc<dyn MetricsSource>>,
        config: RealtimeConfig,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            engine: BroadcastEngine::new(registry.clone()),
            metrics: MetricsAggregator::new(source, config.clone()),
            registry,
            verifier,
            config,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn engine(&self) -> &BroadcastEngine {
        &self.engine
    }

    pub fn verifier(&self) -> Arc<dyn IdentityVerifier> {
        self.verifier.clone()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Admit a new, unauthenticated connection
    pub async fn on_connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Arc<str>>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(id, tx).await;
        tracing::info!(connection_id = %id, "[Realtime] Connection opened");
        (id, rx)
    }

    /// Parse and handle one text frame
    pub async fn handle_text(&self, id: ConnectionId, text: &str) {
        match ClientMessage::from_json(text) {
            Ok(message) => self.handle_message(id, message).await,
            Err(e) => {
                tracing::debug!(connection_id = %id, "[Realtime] Unparseable frame: {}", e);
                self.reply(id, ServerMessage::error("invalid_message", e.to_string()))
                    .await;
            }
        }
    }

    /// Dispatch a parsed client message
    pub async fn handle_message(&self, id: ConnectionId, message: ClientMessage) {
        tracing::trace!(connection_id = %id, kind = message.name(), "[Realtime] Client message");
        match message {
            ClientMessage::Authenticate { token } => self.on_authenticate(id, &token).await,
            ClientMessage::SubscribeTopic { topic } => self.on_subscribe_topic(id, &topic).await,
            ClientMessage::RequestMetrics => self.on_request_metrics(id).await,
            ClientMessage::RequestActivityFeed { limit, offset } => {
                self.on_request_activity_feed(id, limit, offset).await
            }
            ClientMessage::Ping => self.on_ping(id).await,
        }
    }

    /// Run the authentication handshake
    pub async fn on_authenticate(&self, id: ConnectionId, token: &str) {
        let identity = match self
            .registry
            .authenticate(id, token, self.verifier.as_ref(), self.config.auth_timeout())
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!(connection_id = %id, "[Auth] {}", e);
                self.reply(id, ServerMessage::AuthError { message: e.detail() })
                    .await;
                return;
            }
        };

        tracing::info!(
            connection_id = %id,
            user_id = %identity.user_id,
            role = %identity.role,
            "[Realtime] Connection authenticated"
        );

        let view = self.metrics_view(&identity.role).await;
        self.reply(id, ServerMessage::Authenticated { user: identity })
            .await;
        self.reply(id, ServerMessage::MetricsUpdate(view)).await;

        let activities = match self.metrics.activity_feed(None, None).await {
            Ok(activities) => activities,
            Err(e) => {
                tracing::warn!(connection_id = %id, "[Realtime] Initial activity feed unavailable: {}", e);
                Vec::new()
            }
        };
        self.reply(id, ServerMessage::ActivityFeed { activities }).await;

        let message = self.active_users_update(true).await;
        let report = self
            .engine
            .broadcast_to_multiple(&GroupKey::privileged(), &message)
            .await;
        self.reap(report.dead).await;
    }

    /// Join an opt-in topic and push its current value
    pub async fn on_subscribe_topic(&self, id: ConnectionId, raw: &str) {
        let topic = match self.registry.join_topic(id, raw).await {
            Ok(topic) => topic,
            Err(e) => {
                tracing::debug!(connection_id = %id, topic = raw, "[Realtime] Subscribe refused: {}", e);
                self.reply(id, ServerMessage::error(e.code(), e.detail())).await;
                return;
            }
        };

        self.reply(id, ServerMessage::Subscribed { topic: topic.to_string() })
            .await;

        let timestamp = Utc::now();
        match topic {
            Topic::InventoryAlerts => {
                let data = serde_json::to_value(self.metrics.inventory_alerts());
                self.reply_json(id, data, ServerMessage::InventoryUpdate, timestamp)
                    .await;
            }
            Topic::Transactions => {
                let Some(role) = self.registry.identity_of(id).await.map(|i| i.role) else {
                    return;
                };
                let visible = project_for_role(&self.metrics.current(), &role)
                    .recent_transactions
                    .unwrap_or_default();
                let data = serde_json::to_value(visible);
                self.reply_json(id, data, ServerMessage::TransactionUpdate, timestamp)
                    .await;
            }
            Topic::Notifications(_) => {}
        }
    }

    /// Role-filtered view of the cached snapshot
    pub async fn on_request_metrics(&self, id: ConnectionId) {
        let Some(identity) = self.require_identity(id).await else {
            return;
        };
        let view = self.metrics_view(&identity.role).await;
        self.reply(id, ServerMessage::MetricsUpdate(view)).await;
    }

    /// Page of the activity feed, or an upstream error for this connection only
    pub async fn on_request_activity_feed(
        &self,
        id: ConnectionId,
        limit: Option<u32>,
        offset: Option<u32>,
    ) {
        if self.require_identity(id).await.is_none() {
            return;
        }
        let message = match self.metrics.activity_feed(limit, offset).await {
            Ok(activities) => ServerMessage::ActivityFeed { activities },
            Err(e) => ServerMessage::error(e.code(), e.detail()),
        };
        self.reply(id, message).await;
    }

    pub async fn on_ping(&self, id: ConnectionId) {
        self.reply(id, ServerMessage::Pong { timestamp: Utc::now() })
            .await;
    }

    /// Remove a connection. Safe to call more than once.
    pub async fn on_disconnect(&self, id: ConnectionId) {
        self.reap(vec![id]).await;
    }

    // ------------------------------------------------------------------
    // Producers
    // ------------------------------------------------------------------

    /// Route a domain event to the connections entitled to it
    pub async fn on_domain_event(&self, event: RealtimeEvent) -> DeliveryReport {
        if let Err(e) = event.validate() {
            tracing::warn!(kind = ?event.kind, "[Realtime] Dropping invalid event: {}", e);
            return DeliveryReport::default();
        }

        let message = event.to_server_message();
        let report = match event.kind {
            EventKind::Transaction => {
                let mut selectors = vec![(GroupKey::Topic(Topic::Transactions), RoleFilter::Any)];
                match &event.shop_id {
                    Some(shop) => selectors.push((GroupKey::shop(shop.clone()), RoleFilter::Privileged)),
                    None => selectors.extend(
                        GroupKey::privileged()
                            .into_iter()
                            .map(|key| (key, RoleFilter::Any)),
                    ),
                }
                let recipients = self.registry.members_filtered(&selectors).await;
                self.engine.deliver(&recipients, &message)
            }
            EventKind::Inventory => {
                self.engine
                    .broadcast(&GroupKey::Topic(Topic::InventoryAlerts), &message)
                    .await
            }
            EventKind::Notification => {
                let mut keys = Vec::with_capacity(3);
                if let Some(user_id) = &event.target_user_id {
                    keys.push(GroupKey::user(user_id.clone()));
                    keys.push(GroupKey::Topic(Topic::Notifications(user_id.clone())));
                }
                if let Some(role) = &event.target_role {
                    keys.push(GroupKey::role(role.clone()));
                }
                self.engine.broadcast_to_multiple(&keys, &message).await
            }
            EventKind::UserStatus => {
                self.engine
                    .broadcast_to_multiple(&GroupKey::privileged(), &message)
                    .await
            }
        };

        tracing::debug!(
            kind = event.kind.message_type(),
            delivered = report.delivered,
            dead = report.dead.len(),
            "[Realtime] Domain event delivered"
        );
        self.reap(report.dead.clone()).await;
        report
    }

    /// Refresh metrics and push each authenticated connection its role view
    pub async fn tick(&self) -> DeliveryReport {
        let active = self.registry.count().await;
        let snapshot = self.metrics.refresh(active).await;

        let mut by_role: HashMap<Role, Vec<Recipient>> = HashMap::new();
        for recipient in self.registry.authenticated().await {
            by_role.entry(recipient.role.clone()).or_default().push(recipient);
        }

        let mut report = DeliveryReport::default();
        for (role, recipients) in by_role {
            let view = project_for_role(&snapshot, &role).with_active_users(active);
            let message = ServerMessage::MetricsUpdate(view);
            report.merge(self.engine.deliver(&recipients, &message));
        }
        self.reap(report.dead.clone()).await;
        report
    }

    /// Tick forever on the configured interval
    pub async fn run_ticker(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let report = self.tick().await;
            tracing::debug!(delivered = report.delivered, "[Metrics] Tick");
        }
    }

    // ------------------------------------------------------------------
    // Public API for write handlers
    // ------------------------------------------------------------------

    pub async fn broadcast_transaction_update(
        &self,
        data: serde_json::Value,
        shop_id: Option<String>,
    ) -> DeliveryReport {
        let event = RealtimeEvent::transaction(data);
        let event = match shop_id {
            Some(shop) => event.with_shop(shop),
            None => event,
        };
        self.on_domain_event(event).await
    }

    pub async fn broadcast_inventory_update(&self, data: serde_json::Value) -> DeliveryReport {
        self.on_domain_event(RealtimeEvent::inventory(data)).await
    }

    pub async fn broadcast_notification(
        &self,
        data: serde_json::Value,
        target_user_id: Option<String>,
        target_role: Option<Role>,
    ) -> Result<DeliveryReport, SharedError> {
        let event = RealtimeEvent::notification(data, target_user_id, target_role);
        event.validate()?;
        Ok(self.on_domain_event(event).await)
    }

    pub async fn broadcast_to_role(&self, role: Role, message: &ServerMessage) -> DeliveryReport {
        self.fan_out(&[GroupKey::role(role)], message).await
    }

    pub async fn broadcast_to_shop(&self, shop_id: &str, message: &ServerMessage) -> DeliveryReport {
        self.fan_out(&[GroupKey::shop(shop_id)], message).await
    }

    pub async fn broadcast_to_user(&self, user_id: &str, message: &ServerMessage) -> DeliveryReport {
        self.fan_out(&[GroupKey::user(user_id)], message).await
    }

    pub async fn broadcast_to_all(&self, message: &ServerMessage) -> DeliveryReport {
        let report = self.engine.broadcast_all(message).await;
        self.reap(report.dead.clone()).await;
        report
    }

    pub async fn is_user_connected(&self, user_id: &str) -> bool {
        self.registry.is_user_connected(user_id).await
    }

    /// Number of authenticated connections
    pub async fn active_user_count(&self) -> usize {
        self.registry.count().await
    }

    /// Role view of the cached metrics with the current presence count
    pub async fn metrics_view(&self, role: &Role) -> RoleMetricsView {
        self.metrics.view_for(role, self.registry.count().await)
    }

    /// `active_users_update`, with the user list only when `include_users`
    pub async fn active_users_update(&self, include_users: bool) -> ServerMessage {
        let count = self.registry.count().await;
        let users = if include_users {
            Some(self.registry.active_users().await)
        } else {
            None
        };
        ServerMessage::ActiveUsersUpdate { count, users }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn fan_out(&self, keys: &[GroupKey], message: &ServerMessage) -> DeliveryReport {
        let report = self.engine.broadcast_to_multiple(keys, message).await;
        self.reap(report.dead.clone()).await;
        report
    }

    async fn reply(&self, id: ConnectionId, message: ServerMessage) {
        let report = self.engine.send_to(id, &message).await;
        self.reap(report.dead).await;
    }

    async fn reply_json<F>(
        &self,
        id: ConnectionId,
        data: Result<serde_json::Value, serde_json::Error>,
        wrap: F,
        timestamp: chrono::DateTime<Utc>,
    ) where
        F: FnOnce(EventEnvelope) -> ServerMessage,
    {
        match data {
            Ok(data) => self.reply(id, wrap(EventEnvelope { data, timestamp })).await,
            Err(e) => tracing::error!(connection_id = %id, "[Realtime] Failed to encode payload: {}", e),
        }
    }

    async fn require_identity(&self, id: ConnectionId) -> Option<Identity> {
        let identity = self.registry.identity_of(id).await;
        if identity.is_none() {
            self.reply(
                id,
                ServerMessage::AuthError {
                    message: "authenticate first".to_string(),
                },
            )
            .await;
        }
        identity
    }

    /// Remove dead connections and announce departures.
    ///
    /// Announcements can uncover more dead queues, so this drains a worklist
    /// instead of recursing.
    async fn reap(&self, dead: Vec<ConnectionId>) {
        let mut pending = dead;
        while let Some(id) = pending.pop() {
            let Some(removed) = self.registry.remove(id).await else {
                continue;
            };
            tracing::info!(connection_id = %id, "[Realtime] Connection closed");
            pending.extend(self.announce_departure(&removed).await.dead);
        }
    }

    async fn announce_departure(&self, removed: &RemovedConnection) -> DeliveryReport {
        let Some(identity) = &removed.identity else {
            return DeliveryReport::default();
        };
        let privileged = GroupKey::privileged();

        let status = RealtimeEvent::user_status(&identity.user_id, &identity.username, "offline");
        let mut report = self
            .engine
            .broadcast_to_multiple(&privileged, &status.to_server_message())
            .await;

        let presence = self.active_users_update(true).await;
        report.merge(self.engine.broadcast_to_multiple(&privileged, &presence).await);
        report
    }
}
