//! Durable storage for drained log batches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;
use vigil_core::logbook::{AuditEntry, ConversationEntry, LogBatch, LogSink};

/// Tagged line written to the instance's JSONL file.
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "lowercase")]
enum Line<'a> {
    Audit(&'a AuditEntry),
    Conversation(&'a ConversationEntry),
}

/// Appends drained batches as JSON lines, one file per worker instance.
pub struct JsonlLogSink {
    dir: PathBuf,
}

impl JsonlLogSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl LogSink for JsonlLogSink {
    async fn persist(&self, batch: LogBatch) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create logs directory")?;

        let path = self.dir.join(format!("{}.jsonl", batch.instance));
        let mut buffer = String::new();
        for entry in &batch.entries {
            buffer.push_str(&serde_json::to_string(&Line::Audit(entry))?);
            buffer.push('\n');
        }
        for conversation in &batch.conversations {
            buffer.push_str(&serde_json::to_string(&Line::Conversation(conversation))?);
            buffer.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(buffer.as_bytes())
            .await
            .context("Failed to write log batch")?;
        file.flush().await?;

        info!(
            instance = %batch.instance,
            entries = batch.entries.len(),
            conversations = batch.conversations.len(),
            "persisted log batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("vigil-sink-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn persists_entries_and_conversations_as_tagged_lines() {
        let dir = scratch_dir();
        let sink = JsonlLogSink::new(dir.clone());
        let instance = Uuid::new_v4();

        sink.persist(LogBatch {
            instance,
            entries: vec![AuditEntry::info("a", "detail")],
            conversations: vec![ConversationEntry {
                question: "q".into(),
                q_timestamp: "t0".into(),
                answer: "a".into(),
                a_timestamp: "t1".into(),
            }],
        })
        .await
        .expect("persist");

        let contents = tokio::fs::read_to_string(dir.join(format!("{instance}.jsonl")))
            .await
            .expect("file written");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"record\":\"audit\""));
        assert!(lines[1].contains("\"record\":\"conversation\""));

        tokio::fs::remove_dir_all(dir).await.ok();
    }

    #[tokio::test]
    async fn second_persist_appends_to_the_same_instance_file() {
        let dir = scratch_dir();
        let sink = JsonlLogSink::new(dir.clone());
        let instance = Uuid::new_v4();

        for _ in 0..2 {
            sink.persist(LogBatch {
                instance,
                entries: vec![AuditEntry::error("boom", "")],
                conversations: vec![],
            })
            .await
            .expect("persist");
        }

        let contents = tokio::fs::read_to_string(dir.join(format!("{instance}.jsonl")))
            .await
            .expect("file written");
        assert_eq!(contents.lines().count(), 2);

        tokio::fs::remove_dir_all(dir).await.ok();
    }
}
