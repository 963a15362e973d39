//! Single-slot buffer for the most recent sensor frame.

use bytes::Bytes;
use std::sync::Mutex;
use std::time::Instant;

/// One received frame, kept as the raw encoded bytes the client sent.
///
/// Decoding is the consumer's business; a malformed frame simply fails to
/// decode there and is dropped without ceremony.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub received_at: Instant,
}

/// Latest-frame store. New frames overwrite the previous one; there is no
/// queue and no history.
#[derive(Debug, Default)]
pub struct FrameStore {
    latest: Mutex<Option<Frame>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, data: Bytes) {
        *self
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Frame {
            data,
            received_at: Instant::now(),
        });
    }

    pub fn latest(&self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
