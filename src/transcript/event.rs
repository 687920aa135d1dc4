//! Transcript update events delivered to consumers

use super::consumer::ConsumerStatus;
use super::message::{Part, PartUpdate};
use crate::state_machine::FinishReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One incremental change to the transcript.
///
/// Applying a captured stream of these, in order, to an empty transcript
/// yields the same message the orchestrator built live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TranscriptEvent {
    /// A new assistant message begins
    MessageStart {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "createdAt")]
        created_at: DateTime<Utc>,
    },
    PartAppended {
        index: usize,
        part: Part,
    },
    PartUpdated {
        index: usize,
        update: PartUpdate,
    },
    /// Coarse orchestrator phase changed
    Status {
        status: ConsumerStatus,
    },
    /// The response reached `Done`
    Finish {
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
        steps: u32,
    },
    /// Response-level failure; committed parts stand
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

impl TranscriptEvent {
    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptEvent::MessageStart { .. } => "message-start",
            TranscriptEvent::PartAppended { .. } => "part-appended",
            TranscriptEvent::PartUpdated { .. } => "part-updated",
            TranscriptEvent::Status { .. } => "status",
            TranscriptEvent::Finish { .. } => "finish",
            TranscriptEvent::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TranscriptEvent::Finish { .. } | TranscriptEvent::Error { .. }
        )
    }
}
