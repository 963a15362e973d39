//! Contract for the long-running sensing task.

use crate::cancel::CancelFlag;

/// The background sensing loop.
///
/// `run` blocks until it observes cancellation or hits an unrecoverable
/// fault. Implementations must poll `cancel` at every natural pause in their
/// work; the orchestration layer never interrupts preemptively, and the
/// caller joining on this loop blocks for as long as it keeps running.
pub trait PresenceLoop: Send + Sync {
    fn run(&self, cancel: &CancelFlag) -> anyhow::Result<()>;
}
