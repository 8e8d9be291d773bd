/**
 * WebSocket Transport
 *
 * `GET /ws` upgrades to a WebSocket and runs one connection:
 *
 * - writer task: drains the connection's outbound queue into the socket
 * - worker task: handles client messages strictly in arrival order; on
 *   close it finishes the message in progress and drops the rest
 * - ping task: keepalive pings on the configured interval
 * - reader loop: forwards text frames to the worker until the peer leaves
 *
 * Connections start unauthenticated. Credentials arrive in-band as an
 * `authenticate` message, never in the URL.
 */

use crate::backend::realtime::registry::ConnectionId;
use crate::backend::realtime::service::RealtimeService;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /ws
pub async fn ws_upgrade(
    State(service): State<Arc<RealtimeService>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_connection(socket, service))
}

/// Drive one WebSocket connection until either side closes it
pub async fn run_connection(socket: WebSocket, service: Arc<RealtimeService>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (id, outbound) = service.on_connect().await;

    // Control frames bypass the shared text queue.
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(writer_task(ws_sender, outbound, control_rx));

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
    let (stop_tx, stop_rx) = oneshot::channel();
    let worker = tokio::spawn(worker_task(service.clone(), id, inbound_rx, stop_rx));

    let ping_interval = service.config().ping_interval();
    let ping_tx = control_tx.clone();
    let pinger = tokio::spawn(async move {
        let mut timer = tokio::time::interval(ping_interval);
        timer.tick().await;
        loop {
            timer.tick().await;
            if ping_tx.send(Message::Ping(Vec::new().into())).is_err() {
                break;
            }
        }
    });

    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                if inbound_tx.send(text.as_str().to_owned()).is_err() {
                    break;
                }
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!(connection_id = %id, "[Realtime] Ignoring binary frame");
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = control_tx.send(Message::Pong(data));
            }
            Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(connection_id = %id, reason = ?frame, "[Realtime] Client initiated close");
                break;
            }
            Some(Err(e)) => {
                tracing::debug!(connection_id = %id, error = %e, "[Realtime] Receive error");
                break;
            }
            None => break,
        }
    }

    pinger.abort();
    // Never abort the worker mid-message: it may be reaping other connections.
    let _ = stop_tx.send(());
    drop(inbound_tx);
    finish_worker(id, worker).await;
    service.on_disconnect(id).await;
    // Removing the registry entry dropped the last queue sender, so the
    // writer finishes on its own once the queue is empty.
    drop(control_tx);
    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        tracing::debug!(connection_id = %id, "[Realtime] Writer did not drain in time");
        abort.abort();
    }
}

async fn worker_task(
    service: Arc<RealtimeService>,
    id: ConnectionId,
    mut inbound: mpsc::UnboundedReceiver<String>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let text = tokio::select! {
            biased;
            _ = &mut stop => break,
            text = inbound.recv() => match text {
                Some(text) => text,
                None => break,
            },
        };
        service.handle_text(id, &text).await;
    }
}

/// Wait for a stopped worker. A worker that overruns is detached, never
/// aborted.
async fn finish_worker(id: ConnectionId, worker: JoinHandle<()>) {
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(connection_id = %id, "[Realtime] Worker failed: {}", e),
        Err(_) => tracing::debug!(connection_id = %id, "[Realtime] Worker still busy, detaching"),
    }
}

async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Arc<str>>,
    mut control: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        let message = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => Message::Text(frame.as_ref().into()),
                None => break,
            },
            Some(message) = control.recv() => message,
        };
        if ws_sender.send(message).await.is_err() {
            break;
        }
    }
    let _ = ws_sender.close().await;
}
