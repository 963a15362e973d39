//! Shared Application State
//!
//! This module defines the `AppState` struct: the single orchestration
//! object, constructed once at startup in `bin/api.rs` and passed by `Arc`
//! to every handler. All shared mutable state (mode register, connection
//! registry, worker handle, frame slot, log buffers) lives behind it; there
//! are no ambient globals.

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::worker::WorkerController;
use std::sync::Arc;
use vigil_core::frames::FrameStore;
use vigil_core::logbook::{LogBook, LogSink};
use vigil_core::mode::SharedMode;
use vigil_core::presence::PresenceLoop;
use vigil_core::thinker::Thinker;
use vigil_core::token::TokenProvider;

/// The shared application state. All fields are public to be accessible
/// from other modules.
#[derive(Clone)]
pub struct AppState {
    pub mode: Arc<SharedMode>,
    pub broadcaster: Arc<Broadcaster>,
    pub worker: Arc<WorkerController>,
    pub frames: Arc<FrameStore>,
    pub logbook: Arc<LogBook>,
    pub sink: Arc<dyn LogSink>,
    pub thinker: Arc<dyn Thinker>,
    pub tokens: Arc<dyn TokenProvider>,
    pub sensing: Arc<dyn PresenceLoop>,
    pub config: Arc<Config>,
}
