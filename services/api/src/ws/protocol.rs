//! Defines the WebSocket message protocol between the browser client and the server.
//!
//! Every structured unit in either direction is an `{event, data}` pair.
//! Inbound events are parsed into the closed [`ClientCommand`] set; names
//! outside it land in the `Unknown` arm and are ignored, which keeps the
//! channel forward compatible.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigil_core::logbook::ConversationEntry;
use vigil_core::mode::Mode;

/// Raw shape of every structured message from the client.
#[derive(Deserialize, Debug)]
pub struct InboundEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Payload of an `info-log` command.
#[derive(Deserialize, Debug)]
pub struct InfoLogPayload {
    pub event: String,
    pub detail: String,
}

/// Commands recognized from the client.
#[derive(Debug)]
pub enum ClientCommand {
    /// Generate a spoken reply to a finished user utterance.
    StartThinking { transcript: String },
    /// Launch a fresh sensing loop directly.
    BackToIdle,
    /// The client started playing a spoken reply.
    Speaking,
    /// Caller-supplied audit entry.
    InfoLog { event: String, detail: String },
    /// One question/answer exchange for the transcript.
    ConversationLog(ConversationEntry),
    /// Flush buffered records to durable storage.
    SaveLogs,
    /// Client-side failure report.
    Error { detail: Option<Value> },
    /// Anything else; accepted and ignored.
    Unknown { event: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{command}` requires {expected} in `data`")]
    BadData {
        command: &'static str,
        expected: &'static str,
    },
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let envelope: InboundEnvelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    fn from_envelope(envelope: InboundEnvelope) -> Result<Self, ParseError> {
        match envelope.event.as_str() {
            "start-thinking" => match envelope.data {
                Some(Value::String(transcript)) => Ok(Self::StartThinking { transcript }),
                _ => Err(ParseError::BadData {
                    command: "start-thinking",
                    expected: "a transcript string",
                }),
            },
            "back-to-idle" => Ok(Self::BackToIdle),
            "speaking" => Ok(Self::Speaking),
            "info-log" => {
                let data = envelope.data.ok_or(ParseError::BadData {
                    command: "info-log",
                    expected: "an {event, detail} object",
                })?;
                let payload: InfoLogPayload = serde_json::from_value(data)?;
                Ok(Self::InfoLog {
                    event: payload.event,
                    detail: payload.detail,
                })
            }
            "conversation-log" => {
                let data = envelope.data.ok_or(ParseError::BadData {
                    command: "conversation-log",
                    expected: "a {question, q_timestamp, answer, a_timestamp} object",
                })?;
                let entry: ConversationEntry = serde_json::from_value(data)?;
                Ok(Self::ConversationLog(entry))
            }
            "save-logs" => Ok(Self::SaveLogs),
            "error" => Ok(Self::Error {
                detail: envelope.data,
            }),
            _ => Ok(Self::Unknown {
                event: envelope.event,
            }),
        }
    }

    /// The wire name of this command, for audit records.
    pub fn label(&self) -> &str {
        match self {
            Self::StartThinking { .. } => "start-thinking",
            Self::BackToIdle => "back-to-idle",
            Self::Speaking => "speaking",
            Self::InfoLog { .. } => "info-log",
            Self::ConversationLog(_) => "conversation-log",
            Self::SaveLogs => "save-logs",
            Self::Error { .. } => "error",
            Self::Unknown { event } => event,
        }
    }
}

/// A single event broadcast to attached clients.
///
/// The event name is typed as [`Mode`] because every broadcast also commits
/// its name as the current mode.
#[derive(Serialize, Debug, Clone)]
pub struct OutboundEvent {
    pub event: Mode,
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_start_thinking_with_transcript() {
        let cmd =
            ClientCommand::parse(r#"{"event":"start-thinking","data":"what is rust"}"#).unwrap();
        match cmd {
            ClientCommand::StartThinking { transcript } => assert_eq!(transcript, "what is rust"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn start_thinking_without_transcript_is_rejected() {
        let err = ClientCommand::parse(r#"{"event":"start-thinking"}"#).unwrap_err();
        assert!(matches!(err, ParseError::BadData { .. }));
    }

    #[test]
    fn parses_dataless_commands() {
        assert!(matches!(
            ClientCommand::parse(r#"{"event":"back-to-idle"}"#).unwrap(),
            ClientCommand::BackToIdle
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"event":"speaking"}"#).unwrap(),
            ClientCommand::Speaking
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"event":"save-logs"}"#).unwrap(),
            ClientCommand::SaveLogs
        ));
    }

    #[test]
    fn parses_info_log_payload() {
        let cmd = ClientCommand::parse(
            r#"{"event":"info-log","data":{"event":"Token Created","detail":"Speaking start"}}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::InfoLog { event, detail } => {
                assert_eq!(event, "Token Created");
                assert_eq!(detail, "Speaking start");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn info_log_with_missing_key_is_rejected() {
        let err =
            ClientCommand::parse(r#"{"event":"info-log","data":{"event":"x"}}"#).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn parses_conversation_log_payload() {
        let cmd = ClientCommand::parse(
            r#"{"event":"conversation-log","data":{"question":"q","q_timestamp":"t0","answer":"a","a_timestamp":"t1"}}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::ConversationLog(entry) => {
                assert_eq!(entry.question, "q");
                assert_eq!(entry.a_timestamp, "t1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn error_keeps_its_raw_detail() {
        let cmd =
            ClientCommand::parse(r#"{"event":"error","data":"sensor offline"}"#).unwrap();
        match cmd {
            ClientCommand::Error { detail } => {
                assert_eq!(detail, Some(json!("sensor offline")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_events_fall_through_to_unknown() {
        let cmd = ClientCommand::parse(r#"{"event":"back-to-listening"}"#).unwrap();
        match cmd {
            ClientCommand::Unknown { event } => assert_eq!(event, "back-to-listening"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            ClientCommand::parse("{not json").unwrap_err(),
            ParseError::Json(_)
        ));
        // A syntactically valid payload without an `event` key is equally malformed.
        assert!(matches!(
            ClientCommand::parse(r#"{"data":"x"}"#).unwrap_err(),
            ParseError::Json(_)
        ));
    }

    #[test]
    fn outbound_events_serialize_as_event_data_pairs() {
        let event = OutboundEvent {
            event: Mode::LoopStarted,
            data: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "loop-started", "data": null})
        );

        let event = OutboundEvent {
            event: Mode::Other("start-speaking".into()),
            data: Some(json!("hello there")),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "start-speaking", "data": "hello there"})
        );
    }
}
