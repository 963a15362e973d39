//! Buffered audit and conversation records.
//!
//! Records accumulate in memory per worker instance and are drained to a
//! [`LogSink`] on demand (the client's `save-logs` and `error` commands).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Info,
    Error,
}

/// A single notable event, timestamped at record time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event: String,
    pub detail: String,
    pub kind: AuditKind,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn info(event: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            detail: detail.into(),
            kind: AuditKind::Info,
            recorded_at: Utc::now(),
        }
    }

    pub fn error(event: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            detail: detail.into(),
            kind: AuditKind::Error,
            recorded_at: Utc::now(),
        }
    }
}

/// One question/answer exchange. Timestamps are whatever the client sent;
/// they pass through opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub question: String,
    pub q_timestamp: String,
    pub answer: String,
    pub a_timestamp: String,
}

/// Everything drained from the book in one flush.
#[derive(Debug, Clone, Serialize)]
pub struct LogBatch {
    pub instance: Uuid,
    pub entries: Vec<AuditEntry>,
    pub conversations: Vec<ConversationEntry>,
}

/// Durable storage for drained batches. The storage engine behind this is
/// the sink implementation's concern.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn persist(&self, batch: LogBatch) -> anyhow::Result<()>;
}

#[derive(Debug)]
struct BookInner {
    instance: Uuid,
    entries: Vec<AuditEntry>,
    conversations: Vec<ConversationEntry>,
}

/// In-memory buffer of audit and conversation records.
#[derive(Debug)]
pub struct LogBook {
    inner: Mutex<BookInner>,
}

impl LogBook {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BookInner {
                instance: Uuid::new_v4(),
                entries: Vec::new(),
                conversations: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BookInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, entry: AuditEntry) {
        self.lock().entries.push(entry);
    }

    pub fn record_conversation(&self, entry: ConversationEntry) {
        self.lock().conversations.push(entry);
    }

    /// Rotates the instance id for a new worker run. Buffered records stay
    /// and drain under the new instance.
    pub fn start_new_instance(&self) -> Uuid {
        let mut inner = self.lock();
        inner.instance = Uuid::new_v4();
        inner.instance
    }

    pub fn instance(&self) -> Uuid {
        self.lock().instance
    }

    /// Empties the buffers and hands everything back for persistence.
    pub fn drain(&self) -> LogBatch {
        let mut inner = self.lock();
        LogBatch {
            instance: inner.instance,
            entries: std::mem::take(&mut inner.entries),
            conversations: std::mem::take(&mut inner.conversations),
        }
    }

    /// Read-only copy of the current buffers.
    pub fn snapshot(&self) -> (Vec<AuditEntry>, Vec<ConversationEntry>) {
        let inner = self.lock();
        (inner.entries.clone(), inner.conversations.clone())
    }
}

impl Default for LogBook {
    fn default() -> Self {
        Self::new()
    }
}
