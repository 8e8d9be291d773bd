/**
 * Domain Event Queue
 *
 * Write handlers publish events here and return immediately. A single
 * consumer task drains the queue into the realtime service, independently
 * of the metrics tick.
 */

use crate::backend::realtime::service::RealtimeService;
use crate::shared::{RealtimeEvent, SharedError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error, PartialEq)]
pub enum PublishError {
    #[error(transparent)]
    Invalid(#[from] SharedError),
    #[error("event consumer has stopped")]
    Closed,
}

/// Cloneable handle for publishing domain events
#[derive(Debug, Clone)]
pub struct DomainEventPublisher {
    tx: mpsc::UnboundedSender<RealtimeEvent>,
}

impl DomainEventPublisher {
    /// Validate and enqueue an event
    pub fn publish(&self, event: RealtimeEvent) -> Result<(), PublishError> {
        event.validate()?;
        self.tx.send(event).map_err(|_| PublishError::Closed)
    }
}

/// Receiving end, consumed by [`DomainEventQueue::run`]
#[derive(Debug)]
pub struct DomainEventQueue {
    rx: mpsc::UnboundedReceiver<RealtimeEvent>,
}

/// Create a publisher and its queue
pub fn domain_event_queue() -> (DomainEventPublisher, DomainEventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DomainEventPublisher { tx }, DomainEventQueue { rx })
}

impl DomainEventQueue {
    /// Deliver events until every publisher is dropped
    pub async fn run(mut self, service: Arc<RealtimeService>) {
        tracing::info!("[Realtime] Domain event consumer started");
        while let Some(event) = self.rx.recv().await {
            service.on_domain_event(event).await;
        }
        tracing::info!("[Realtime] Domain event consumer stopped");
    }
}
