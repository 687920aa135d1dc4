//! Read-side contract for rendering and telemetry layers

use super::builder::{apply_to_message, BuilderError};
use super::event::TranscriptEvent;
use super::message::{Message, Role, ToolState};
use serde::{Deserialize, Serialize};

/// Coarse display status derived from the orchestrator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumerStatus {
    #[default]
    Idle,
    Reasoning,
    StreamingText,
    Error,
}

/// What a renderer may read from a conversation
pub trait TranscriptView {
    /// Every message in arrival order, including a partially built one
    fn messages(&self) -> &[Message];

    fn status(&self) -> ConsumerStatus;

    /// Number of tool parts that produced output ("tool runs" metric)
    fn tool_runs(&self) -> usize {
        self.messages()
            .iter()
            .flat_map(Message::tool_parts)
            .filter(|t| t.state == ToolState::OutputAvailable)
            .count()
    }
}

/// Client-side conversation that follows a transcript event stream
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    status: ConsumerStatus,
    /// Whether the last message is still receiving parts
    streaming: bool,
    last_error: Option<String>,
}

impl Conversation {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one event from the transport stream
    pub fn apply(&mut self, event: &TranscriptEvent) -> Result<(), BuilderError> {
        match event {
            TranscriptEvent::MessageStart {
                message_id,
                created_at,
            } => {
                self.messages
                    .push(Message::assistant(message_id.clone(), *created_at));
                self.streaming = true;
                Ok(())
            }
            TranscriptEvent::PartAppended { .. } | TranscriptEvent::PartUpdated { .. } => {
                if !self.streaming {
                    return Err(BuilderError::NotStarted);
                }
                let message = self
                    .messages
                    .last_mut()
                    .filter(|m| m.role == Role::Assistant)
                    .ok_or(BuilderError::NotStarted)?;
                apply_to_message(message, event)
            }
            TranscriptEvent::Status { status } => {
                self.status = *status;
                Ok(())
            }
            TranscriptEvent::Finish { .. } => {
                self.streaming = false;
                self.status = ConsumerStatus::Idle;
                Ok(())
            }
            TranscriptEvent::Error { error_text } => {
                self.streaming = false;
                self.status = ConsumerStatus::Error;
                self.last_error = Some(error_text.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
impl Conversation {
    /// Add the user's message before submitting it
    pub fn push_user(&mut self, text: impl Into<String>) -> &Message {
        self.last_error = None;
        self.messages.push(Message::user(text));
        &self.messages[self.messages.len() - 1]
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

impl TranscriptView for Conversation {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn status(&self) -> ConsumerStatus {
        self.status
    }
}
