//! Process-wide mode register.
//!
//! The mode is a last-write-wins label, not a guarded state machine: any
//! value may follow any value. Every broadcast also commits its event name
//! here, so the set of observable modes is open-ended.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Mutex;

/// The current process-wide status label.
///
/// The named variants are the labels the client renders natively; anything
/// else arriving through a broadcast is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Away,
    Speaking,
    Error,
    LoopStarted,
    LoopStopped,
    Other(String),
}

impl Mode {
    /// The wire label for this mode.
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Idle => "idle",
            Mode::Away => "away",
            Mode::Speaking => "speaking",
            Mode::Error => "error",
            Mode::LoopStarted => "loop-started",
            Mode::LoopStopped => "loop-stopped",
            Mode::Other(label) => label,
        }
    }
}

impl From<&str> for Mode {
    fn from(label: &str) -> Self {
        match label {
            "idle" => Mode::Idle,
            "away" => Mode::Away,
            "speaking" => Mode::Speaking,
            "error" => Mode::Error,
            "loop-started" => Mode::LoopStarted,
            "loop-stopped" => Mode::LoopStopped,
            other => Mode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Mode::from(label.as_str()))
    }
}

/// Thread-safe register holding the current [`Mode`].
///
/// Safe to call from the control plane, worker threads, and the dispatcher
/// concurrently. A read before any write returns [`Mode::Idle`].
#[derive(Debug, Default)]
pub struct SharedMode {
    current: Mutex<Mode>,
}

impl SharedMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Mode {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, mode: Mode) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = mode;
    }
}
