/**
 * Broadcast Engine
 *
 * Fans a server message out to a target: one connection, a group, several
 * groups or every authenticated connection. The message is serialized once
 * and the same frame is pushed onto each recipient's unbounded queue, so a
 * slow consumer never blocks the sender.
 *
 * Membership is resolved at call time. A recipient whose queue is closed is
 * skipped and listed in the report as dead; reaping it is the caller's job.
 */

use crate::backend::error::RealtimeError;
use crate::backend::realtime::groups::GroupKey;
use crate::backend::realtime::registry::{
    ConnectionId, ConnectionRegistry, ConnectionSender, Recipient,
};
use crate::shared::{ServerMessage, SharedError};
use std::sync::Arc;

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Frames queued
    pub delivered: usize,
    /// Recipients whose queue was closed
    pub dead: Vec<ConnectionId>,
}

impl DeliveryReport {
    /// Count one send attempt. A closed queue lands in `dead`.
    pub fn record(&mut self, outcome: Result<(), RealtimeError>) {
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(RealtimeError::TransportError { connection_id }) => {
                tracing::debug!(%connection_id, "[Realtime] Outbound queue closed");
                self.dead.push(connection_id);
            }
            Err(e) => tracing::warn!("[Realtime] Send failed: {}", e),
        }
    }

    pub fn merge(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.dead.extend(other.dead);
    }
}

/// Serializes once, delivers to many
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastEngine {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Encode a message into a shareable text frame
    pub fn encode(message: &ServerMessage) -> Result<Arc<str>, SharedError> {
        Ok(Arc::from(serde_json::to_string(message)?))
    }

    /// Send to one connection, authenticated or not
    pub async fn send_to(&self, id: ConnectionId, message: &ServerMessage) -> DeliveryReport {
        let Some(sender) = self.registry.sender_of(id).await else {
            return DeliveryReport::default();
        };
        let mut report = DeliveryReport::default();
        if let Some(frame) = encode_or_log(message) {
            report.record(push_frame(id, &sender, frame));
        }
        report
    }

    /// Send to every member of a group
    pub async fn broadcast(&self, key: &GroupKey, message: &ServerMessage) -> DeliveryReport {
        let recipients = self.registry.members_of(key).await;
        let report = self.deliver(&recipients, message);
        tracing::debug!(
            group = %key,
            kind = message.message_type(),
            delivered = report.delivered,
            "[Realtime] Group broadcast"
        );
        report
    }

    /// Send once to every connection in the union of `keys`
    pub async fn broadcast_to_multiple(
        &self,
        keys: &[GroupKey],
        message: &ServerMessage,
    ) -> DeliveryReport {
        let recipients = self.registry.members_of_any(keys).await;
        self.deliver(&recipients, message)
    }

    /// Send to every authenticated connection
    pub async fn broadcast_all(&self, message: &ServerMessage) -> DeliveryReport {
        let recipients = self.registry.authenticated().await;
        self.deliver(&recipients, message)
    }

    /// Send to an already resolved recipient list
    pub fn deliver(&self, recipients: &[Recipient], message: &ServerMessage) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if recipients.is_empty() {
            return report;
        }
        let Some(frame) = encode_or_log(message) else {
            return report;
        };
        for recipient in recipients {
            report.record(push_frame(recipient.id, &recipient.sender, frame.clone()));
        }
        report
    }
}

/// Queue a frame, or fail with `TransportError` if the receiver is gone
pub fn push_frame(
    id: ConnectionId,
    sender: &ConnectionSender,
    frame: Arc<str>,
) -> Result<(), RealtimeError> {
    sender.send(frame).map_err(|_| RealtimeError::transport(id))
}

fn encode_or_log(message: &ServerMessage) -> Option<Arc<str>> {
    match BroadcastEngine::encode(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(
                kind = message.message_type(),
                "[Realtime] Failed to serialize message: {}",
                e
            );
            None
        }
    }
}
