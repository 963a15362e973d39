//! Lifecycle control for the background sensing loop.

use crate::broadcast::Broadcaster;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vigil_core::cancel::CancelFlag;
use vigil_core::capture::CaptureDevice;
use vigil_core::logbook::{AuditEntry, LogBook};
use vigil_core::mode::{Mode, SharedMode};
use vigil_core::presence::PresenceLoop;

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("No WebSocket client connected")]
    NoClient,
    #[error("Loop already running")]
    AlreadyRunning,
}

/// Starts and stops the sensing loop, keeping at most one controller-owned
/// instance alive at a time.
///
/// The handle slot's lock is held across every check-then-act sequence, so
/// concurrent `start` calls cannot both launch and `stop` cannot race a
/// `start` into resurrecting a half-cancelled loop.
pub struct WorkerController {
    handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancelFlag,
    sensing: Arc<dyn PresenceLoop>,
    broadcaster: Arc<Broadcaster>,
    mode: Arc<SharedMode>,
    logbook: Arc<LogBook>,
    capture: Arc<dyn CaptureDevice>,
}

impl WorkerController {
    pub fn new(
        sensing: Arc<dyn PresenceLoop>,
        broadcaster: Arc<Broadcaster>,
        mode: Arc<SharedMode>,
        logbook: Arc<LogBook>,
        capture: Arc<dyn CaptureDevice>,
    ) -> Self {
        Self {
            handle: Mutex::new(None),
            cancel: CancelFlag::new(),
            sensing,
            broadcaster,
            mode,
            logbook,
            capture,
        }
    }

    /// Launches the sensing loop on the blocking pool.
    ///
    /// Faults inside the loop never reach this caller: by the time they can
    /// happen, `start` has already returned. They are resolved at the task
    /// boundary into an `away` downgrade and an error audit entry.
    pub async fn start(&self) -> Result<(), StartError> {
        if !self.broadcaster.is_attached() {
            return Err(StartError::NoClient);
        }

        let mut slot = self.handle.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(StartError::AlreadyRunning);
        }

        self.cancel.reset();
        let instance = self.logbook.start_new_instance();
        self.broadcaster.publish(Mode::LoopStarted, None);
        self.logbook.record(AuditEntry::info(
            "Start loop triggered",
            format!("Instance {instance} started"),
        ));

        let sensing = Arc::clone(&self.sensing);
        let cancel = self.cancel.clone();
        let broadcaster = Arc::clone(&self.broadcaster);
        let mode = Arc::clone(&self.mode);
        let logbook = Arc::clone(&self.logbook);
        *slot = Some(tokio::task::spawn_blocking(move || {
            if let Err(fault) = sensing.run(&cancel) {
                error!(error = ?fault, "sensing loop faulted");
                broadcaster.publish(Mode::Away, None);
                mode.set(Mode::Away);
                logbook.record(AuditEntry::error("Sensing loop fault", fault.to_string()));
            }
        }));
        info!("sensing loop started");
        Ok(())
    }

    /// Stops the loop and waits for the worker to fully exit.
    ///
    /// The join is bounded only by the loop's own poll granularity: a loop
    /// that stops checking its cancel flag hangs this call indefinitely.
    /// With no worker running this is a no-op that still performs the
    /// broadcasts and cleanup, so repeated stops are safe.
    pub async fn stop(&self, broadcast_idle: bool) {
        self.cancel.trigger();
        {
            let mut slot = self.handle.lock().await;
            if let Some(handle) = slot.take() {
                if let Err(join_error) = handle.await {
                    error!(error = ?join_error, "sensing task panicked");
                }
            }
        }

        self.broadcaster.publish(Mode::LoopStopped, None);
        if broadcast_idle {
            self.broadcaster.publish(Mode::Idle, None);
        }
        self.logbook
            .record(AuditEntry::info("Stop loop triggered", "Instance stopped"));
        self.capture.release();
        info!("sensing loop stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The cancel flag shared with every sensing instance, including ones
    /// launched outside this controller.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ClientConnection;
    use crate::ws::protocol::OutboundEvent;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use uuid::Uuid;
    use vigil_core::capture::MicCapture;
    use vigil_core::logbook::AuditKind;

    /// Sensing double that runs until cancelled, polling every few ms.
    struct CooperativeLoop;

    impl PresenceLoop for CooperativeLoop {
        fn run(&self, cancel: &CancelFlag) -> anyhow::Result<()> {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }
    }

    /// Sensing double that faults immediately.
    struct FaultingLoop;

    impl PresenceLoop for FaultingLoop {
        fn run(&self, _cancel: &CancelFlag) -> anyhow::Result<()> {
            anyhow::bail!("sensor offline")
        }
    }

    struct Fixture {
        controller: Arc<WorkerController>,
        broadcaster: Arc<Broadcaster>,
        mode: Arc<SharedMode>,
        logbook: Arc<LogBook>,
    }

    fn fixture(sensing: Arc<dyn PresenceLoop>) -> Fixture {
        let mode = Arc::new(SharedMode::new());
        let logbook = Arc::new(LogBook::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&mode), Arc::clone(&logbook)));
        let controller = Arc::new(WorkerController::new(
            sensing,
            Arc::clone(&broadcaster),
            Arc::clone(&mode),
            Arc::clone(&logbook),
            Arc::new(MicCapture::new()) as Arc<dyn CaptureDevice>,
        ));
        Fixture {
            controller,
            broadcaster,
            mode,
            logbook,
        }
    }

    fn attach_client(broadcaster: &Broadcaster) -> mpsc::UnboundedReceiver<OutboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.attach(ClientConnection::new(Uuid::new_v4(), tx));
        rx
    }

    async fn wait_until_stopped(controller: &WorkerController) {
        for _ in 0..200 {
            if !controller.is_running().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker never finished");
    }

    #[tokio::test]
    async fn start_without_client_is_refused() {
        let f = fixture(Arc::new(CooperativeLoop));
        let err = f.controller.start().await.unwrap_err();
        assert!(matches!(err, StartError::NoClient));
        assert!(!f.controller.is_running().await);
    }

    #[tokio::test]
    async fn double_start_is_refused_while_running() {
        let f = fixture(Arc::new(CooperativeLoop));
        let _rx = attach_client(&f.broadcaster);

        f.controller.start().await.expect("first start");
        let err = f.controller.start().await.unwrap_err();
        assert!(matches!(err, StartError::AlreadyRunning));

        f.controller.stop(true).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_launch_exactly_one_worker() {
        let f = fixture(Arc::new(CooperativeLoop));
        let _rx = attach_client(&f.broadcaster);

        let mut attempts = Vec::new();
        for _ in 0..8 {
            let controller = Arc::clone(&f.controller);
            attempts.push(tokio::spawn(async move { controller.start().await }));
        }

        let mut successes = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        f.controller.stop(true).await;
    }

    #[tokio::test]
    async fn stop_broadcasts_loop_stopped_then_idle() {
        let f = fixture(Arc::new(CooperativeLoop));
        let mut rx = attach_client(&f.broadcaster);

        f.controller.start().await.expect("start");
        assert_eq!(rx.recv().await.unwrap().event, Mode::LoopStarted);

        f.controller.stop(true).await;
        assert_eq!(rx.recv().await.unwrap().event, Mode::LoopStopped);
        assert_eq!(rx.recv().await.unwrap().event, Mode::Idle);
        assert_eq!(f.mode.get(), Mode::Idle);
        assert!(!f.controller.is_running().await);
    }

    #[tokio::test]
    async fn stop_can_skip_the_idle_broadcast() {
        let f = fixture(Arc::new(CooperativeLoop));
        let mut rx = attach_client(&f.broadcaster);

        f.controller.start().await.expect("start");
        let _ = rx.recv().await;

        f.controller.stop(false).await;
        assert_eq!(rx.recv().await.unwrap().event, Mode::LoopStopped);
        assert_eq!(f.mode.get(), Mode::LoopStopped);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let f = fixture(Arc::new(CooperativeLoop));
        let _rx = attach_client(&f.broadcaster);

        f.controller.stop(true).await;
        f.controller.stop(true).await;

        assert_eq!(f.mode.get(), Mode::Idle);
        assert!(!f.controller.is_running().await);
    }

    #[tokio::test]
    async fn start_is_allowed_again_after_stop() {
        let f = fixture(Arc::new(CooperativeLoop));
        let _rx = attach_client(&f.broadcaster);

        f.controller.start().await.expect("first run");
        f.controller.stop(true).await;
        f.controller.start().await.expect("second run");
        f.controller.stop(true).await;
    }

    #[tokio::test]
    async fn fault_downgrades_to_away_with_one_error_entry() {
        let f = fixture(Arc::new(FaultingLoop));
        let _rx = attach_client(&f.broadcaster);

        f.controller.start().await.expect("start returns ok");
        wait_until_stopped(&f.controller).await;

        assert_eq!(f.mode.get(), Mode::Away);
        let (entries, _) = f.logbook.snapshot();
        let errors: Vec<_> = entries
            .iter()
            .filter(|entry| entry.kind == AuditKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].detail.contains("sensor offline"));
    }

    #[tokio::test]
    async fn stop_releases_the_capture_device() {
        let mode = Arc::new(SharedMode::new());
        let logbook = Arc::new(LogBook::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&mode), Arc::clone(&logbook)));
        let capture = Arc::new(MicCapture::new());
        capture.claim();
        let controller = WorkerController::new(
            Arc::new(CooperativeLoop),
            broadcaster,
            mode,
            logbook,
            Arc::clone(&capture) as Arc<dyn CaptureDevice>,
        );

        controller.stop(true).await;
        assert!(!capture.is_held());
    }
}
