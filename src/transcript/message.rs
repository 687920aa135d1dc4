//! Message and part types

use crate::tools::ToolName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Who contributed a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of a tool invocation part.
///
/// The only legal progression is
/// `input-streaming -> input-available -> (output-available | output-error)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

impl ToolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolState::OutputAvailable | ToolState::OutputError)
    }

    fn rank(self) -> u8 {
        match self {
            ToolState::InputStreaming => 0,
            ToolState::InputAvailable => 1,
            ToolState::OutputAvailable | ToolState::OutputError => 2,
        }
    }

    /// Whether `next` is the immediate successor of `self`
    pub fn can_advance_to(self, next: ToolState) -> bool {
        next.rank() == self.rank() + 1
    }
}

/// One tool invocation record inside an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    pub tool_call_id: String,
    pub tool_name: ToolName,
    pub state: ToolState,
    /// Partial while streaming, complete from `input-available` on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl ToolPart {
    /// A freshly announced invocation with no arguments yet
    pub fn streaming(tool_call_id: impl Into<String>, tool_name: ToolName) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name,
            state: ToolState::InputStreaming,
            input: None,
            output: None,
            error_text: None,
        }
    }

    /// Payload fields agree with the state
    fn is_consistent(&self) -> bool {
        match self.state {
            ToolState::InputStreaming | ToolState::InputAvailable => {
                self.output.is_none() && self.error_text.is_none()
            }
            ToolState::OutputAvailable => self.output.is_some() && self.error_text.is_none(),
            ToolState::OutputError => self.output.is_none() && self.error_text.is_some(),
        }
    }
}

/// One atomic contribution within a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text {
        text: String,
    },
    #[serde(rename = "tool-invocation")]
    Tool(ToolPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_tool(&self) -> Option<&ToolPart> {
        match self {
            Part::Tool(tool) => Some(tool),
            Part::Text { .. } => None,
        }
    }
}

/// Index-addressed mutation of an existing part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PartUpdate {
    /// Append text to a text part
    TextDelta { delta: String },
    /// Replace the partial arguments of a tool part that is still streaming
    InputDelta { input: Value },
    InputAvailable { input: Value },
    OutputAvailable { output: Value },
    OutputError {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

impl PartUpdate {
    /// Tool state this update moves to, `None` for updates that keep the state
    pub fn target_state(&self) -> Option<ToolState> {
        match self {
            PartUpdate::TextDelta { .. } | PartUpdate::InputDelta { .. } => None,
            PartUpdate::InputAvailable { .. } => Some(ToolState::InputAvailable),
            PartUpdate::OutputAvailable { .. } => Some(ToolState::OutputAvailable),
            PartUpdate::OutputError { .. } => Some(ToolState::OutputError),
        }
    }
}

/// A single message of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            created_at: Utc::now(),
            parts: vec![Part::text(text)],
        }
    }

    pub fn assistant(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            created_at,
            parts: Vec::new(),
        }
    }

    /// All text parts concatenated
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::Tool(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(Part::as_tool)
    }
}

/// Shape violations in a transcript supplied by a client
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("message {id}: user messages must contain exactly one text part")]
    UserShape { id: String },
    #[error("message {id}: tool part {index} has payload inconsistent with its state")]
    ToolPayload { id: String, index: usize },
    #[error("duplicate message id {0}")]
    DuplicateId(String),
}

/// Check that a prior transcript respects the message invariants
pub fn validate_history(messages: &[Message]) -> Result<(), HistoryError> {
    let mut seen = std::collections::HashSet::new();
    for message in messages {
        if !seen.insert(message.id.as_str()) {
            return Err(HistoryError::DuplicateId(message.id.clone()));
        }
        match message.role {
            Role::User => {
                if !matches!(message.parts.as_slice(), [Part::Text { .. }]) {
                    return Err(HistoryError::UserShape {
                        id: message.id.clone(),
                    });
                }
            }
            Role::Assistant => {
                for (index, part) in message.parts.iter().enumerate() {
                    if let Part::Tool(tool) = part {
                        if !tool.is_consistent() {
                            return Err(HistoryError::ToolPayload {
                                id: message.id.clone(),
                                index,
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
