//! Cooperative cancellation for the sensing worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag polled by the sensing loop.
///
/// Cancellation is purely cooperative: the worker contract is to check
/// [`CancelFlag::is_cancelled`] at every natural suspension point, at
/// tens-of-milliseconds granularity or better. Nothing here can interrupt a
/// worker that stops polling, so a `stop` that joins the worker will hang on
/// such a loop. That risk is accepted rather than hidden behind a timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current worker run.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Re-arm the flag before a new worker run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
