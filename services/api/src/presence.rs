//! Frame-freshness presence sensing.

use crate::broadcast::Broadcaster;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use vigil_core::cancel::CancelFlag;
use vigil_core::frames::FrameStore;
use vigil_core::mode::Mode;
use vigil_core::presence::PresenceLoop;

/// How often the loop polls the cancel flag and the frame store.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A client that has not delivered a frame for this long counts as away.
const FRAME_STALE_AFTER: Duration = Duration::from_secs(2);

/// Presence detection driven by webcam frame freshness.
///
/// The browser client streams webcam frames over the realtime channel into
/// the single-slot frame store; this loop watches the slot and treats a
/// stale or absent frame as the user having left. A heavier classifier can
/// replace it by swapping the `PresenceLoop` wiring in `bin/api.rs`.
pub struct FrameWatchLoop {
    frames: Arc<FrameStore>,
    broadcaster: Arc<Broadcaster>,
}

impl FrameWatchLoop {
    pub fn new(frames: Arc<FrameStore>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            frames,
            broadcaster,
        }
    }

    fn user_is_present(&self) -> bool {
        self.frames
            .latest()
            .is_some_and(|frame| frame.received_at.elapsed() < FRAME_STALE_AFTER)
    }
}

impl PresenceLoop for FrameWatchLoop {
    fn run(&self, cancel: &CancelFlag) -> anyhow::Result<()> {
        let mut present: Option<bool> = None;
        while !cancel.is_cancelled() {
            let now_present = self.user_is_present();
            if present != Some(now_present) {
                present = Some(now_present);
                debug!(present = now_present, "presence transition");
                let mode = if now_present { Mode::Idle } else { Mode::Away };
                self.broadcaster.publish(mode, None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}
