//! Connection registry and the worker-to-client event bridge.
//!
//! `publish` is the one sanctioned crossing point between the blocking
//! worker regime and the connection's cooperative regime: it queues events
//! onto each connection's channel and the connection's own send pump is the
//! only writer on the socket. That keeps concurrent publishers from ever
//! interleaving bytes on one connection, and makes `publish` safe to call
//! synchronously from any thread.

use crate::ws::protocol::OutboundEvent;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;
use vigil_core::logbook::{AuditEntry, LogBook};
use vigil_core::mode::{Mode, SharedMode};

/// One attached realtime client.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl ClientConnection {
    pub fn new(id: Uuid, tx: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self { id, tx }
    }

    fn send(&self, event: OutboundEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Registry of attached connections plus the publish bridge.
///
/// The registry holds a set, but the rest of the system treats cardinality
/// as 0 or 1: one client at a time is the operating assumption, and the
/// `attached` flag is what the worker preconditions check.
pub struct Broadcaster {
    connections: Mutex<Vec<ClientConnection>>,
    attached: AtomicBool,
    mode: Arc<SharedMode>,
    logbook: Arc<LogBook>,
}

impl Broadcaster {
    pub fn new(mode: Arc<SharedMode>, logbook: Arc<LogBook>) -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            attached: AtomicBool::new(false),
            mode,
            logbook,
        }
    }

    fn lock_connections(&self) -> std::sync::MutexGuard<'_, Vec<ClientConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn attach(&self, connection: ClientConnection) {
        {
            let mut connections = self.lock_connections();
            connections.push(connection);
            self.attached.store(true, Ordering::SeqCst);
        }
        self.logbook.record(AuditEntry::info(
            "WebSocket connected",
            "WebSocket client connected",
        ));
    }

    pub fn detach(&self, id: Uuid) {
        {
            let mut connections = self.lock_connections();
            connections.retain(|connection| connection.id != id);
            if connections.is_empty() {
                self.attached.store(false, Ordering::SeqCst);
            }
        }
        self.logbook.record(AuditEntry::info(
            "WebSocket disconnected",
            "WebSocket client disconnected",
        ));
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Fans an event out to every attached connection, then commits the
    /// event label as the new mode.
    ///
    /// The registry is snapshotted under the lock; delivery happens outside
    /// it. A connection whose send pump has gone away is logged and skipped,
    /// never letting one dead client block the rest.
    pub fn publish(&self, event: Mode, data: Option<Value>) {
        let targets: Vec<ClientConnection> = self.lock_connections().clone();
        debug!(event = %event, recipients = targets.len(), "broadcast");
        self.logbook.record(AuditEntry::info(
            format!("Broadcast:[{}] to client", event),
            format!("[PAYLOAD]: {:?}", data),
        ));

        let payload = OutboundEvent {
            event: event.clone(),
            data,
        };
        for connection in &targets {
            if !connection.send(payload.clone()) {
                warn!(conn_id = %connection.id, event = %event, "failed to queue event for connection");
            }
        }

        self.mode.set(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_core::logbook::AuditKind;

    fn make_broadcaster() -> (Arc<Broadcaster>, Arc<SharedMode>, Arc<LogBook>) {
        let mode = Arc::new(SharedMode::new());
        let logbook = Arc::new(LogBook::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&mode), Arc::clone(&logbook)));
        (broadcaster, mode, logbook)
    }

    fn attach_client(
        broadcaster: &Broadcaster,
    ) -> (Uuid, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        broadcaster.attach(ClientConnection::new(id, tx));
        (id, rx)
    }

    #[tokio::test]
    async fn publish_delivers_and_commits_the_label_as_mode() {
        let (broadcaster, mode, _) = make_broadcaster();
        let (_, mut rx) = attach_client(&broadcaster);

        broadcaster.publish(Mode::from("anything-at-all"), Some(json!(42)));

        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event.event.as_str(), "anything-at-all");
        assert_eq!(event.data, Some(json!(42)));
        assert_eq!(mode.get(), Mode::Other("anything-at-all".into()));
    }

    #[tokio::test]
    async fn events_from_one_publisher_arrive_in_order() {
        let (broadcaster, _, _) = make_broadcaster();
        let (_, mut rx) = attach_client(&broadcaster);

        broadcaster.publish(Mode::LoopStopped, None);
        broadcaster.publish(Mode::Idle, None);

        assert_eq!(rx.recv().await.unwrap().event, Mode::LoopStopped);
        assert_eq!(rx.recv().await.unwrap().event, Mode::Idle);
    }

    #[tokio::test]
    async fn publish_from_a_worker_thread_is_delivered() {
        let (broadcaster, mode, _) = make_broadcaster();
        let (_, mut rx) = attach_client(&broadcaster);

        let publisher = Arc::clone(&broadcaster);
        std::thread::spawn(move || {
            publisher.publish(Mode::Away, None);
        })
        .join()
        .expect("publisher thread");

        assert_eq!(rx.recv().await.unwrap().event, Mode::Away);
        assert_eq!(mode.get(), Mode::Away);
    }

    #[tokio::test]
    async fn detach_flips_the_attached_flag_when_empty() {
        let (broadcaster, _, _) = make_broadcaster();
        assert!(!broadcaster.is_attached());

        let (id, _rx) = attach_client(&broadcaster);
        assert!(broadcaster.is_attached());

        broadcaster.detach(id);
        assert!(!broadcaster.is_attached());

        // Reattach works without any reset step.
        let (_, _rx2) = attach_client(&broadcaster);
        assert!(broadcaster.is_attached());
    }

    #[tokio::test]
    async fn dead_connections_do_not_block_delivery_to_others() {
        let (broadcaster, _, _) = make_broadcaster();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        drop(dead_rx);
        broadcaster.attach(ClientConnection::new(Uuid::new_v4(), dead_tx));
        let (_, mut live_rx) = attach_client(&broadcaster);

        broadcaster.publish(Mode::Speaking, None);

        assert_eq!(live_rx.recv().await.unwrap().event, Mode::Speaking);
    }

    #[tokio::test]
    async fn attach_and_publish_record_audit_entries() {
        let (broadcaster, _, logbook) = make_broadcaster();
        let (_, _rx) = attach_client(&broadcaster);
        broadcaster.publish(Mode::LoopStarted, None);

        let (entries, _) = logbook.snapshot();
        assert!(entries.iter().all(|e| e.kind == AuditKind::Info));
        assert!(entries.iter().any(|e| e.event == "WebSocket connected"));
        assert!(
            entries
                .iter()
                .any(|e| e.event == "Broadcast:[loop-started] to client")
        );
    }
}
