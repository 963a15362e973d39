//! Exclusively-held input peripherals.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// An input device the sensing pipeline may hold exclusively (in practice,
/// the microphone).
pub trait CaptureDevice: Send + Sync {
    /// Release the device claim. Called unconditionally on every stop,
    /// whether or not anything was held.
    fn release(&self);
}

/// Tracks the claim on the system input device with an atomic flag.
#[derive(Debug, Default)]
pub struct MicCapture {
    held: AtomicBool,
}

impl MicCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for MicCapture {
    fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            debug!("released input device");
        }
    }
}
