//! Turn state types

use crate::tools::ToolName;
use crate::transcript::ConsumerStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default chaining depth for one response
pub const DEFAULT_MAX_STEPS: u32 = 7;

// ============================================================================
// Tool Call
// ============================================================================

/// A tool invocation requested by the planner, after name resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: ToolName,
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: ToolName, input: Value) -> Self {
        Self {
            id: id.into(),
            name,
            input,
        }
    }
}

// ============================================================================
// Turn State
// ============================================================================

/// Why a response ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// The planner chose to stop
    Stop,
    /// The step budget ran out
    StepLimit,
    Cancelled,
    Timeout,
}

/// Classification of response-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The planner named a tool that is not registered
    UnknownTool,
    /// The planner could not be reached
    Transport,
    /// The executor hit an inconsistency it cannot recover from
    Internal,
}

/// Phase of the assistant response currently being produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TurnState {
    /// Ready for a user message
    #[default]
    Idle,

    /// Waiting for the planner to pick the next step
    #[serde(rename_all = "camelCase")]
    Reasoning {
        steps_taken: u32,
        /// Parts appended to the response so far
        parts: usize,
    },

    /// Text deltas are being delivered into `part_index`
    #[serde(rename_all = "camelCase")]
    StreamingText { steps_taken: u32, part_index: usize },

    /// A tool is executing; its part sits in `input-available`
    #[serde(rename_all = "camelCase")]
    ToolRunning {
        steps_taken: u32,
        part_index: usize,
        call: ToolCall,
    },

    /// Response finished; produced parts stand
    #[serde(rename_all = "camelCase")]
    Done {
        reason: FinishReason,
        steps_taken: u32,
    },

    /// Response failed; produced parts stand
    Error { message: String, kind: ErrorKind },
}

impl TurnState {
    /// Whether a response is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            TurnState::Reasoning { .. }
                | TurnState::StreamingText { .. }
                | TurnState::ToolRunning { .. }
        )
    }

    /// Whether this state ends the response
    pub fn is_finished(&self) -> bool {
        matches!(self, TurnState::Done { .. } | TurnState::Error { .. })
    }

    /// Steps consumed so far, if the response has started
    pub fn steps_taken(&self) -> Option<u32> {
        match self {
            TurnState::Reasoning { steps_taken, .. }
            | TurnState::StreamingText { steps_taken, .. }
            | TurnState::ToolRunning { steps_taken, .. }
            | TurnState::Done { steps_taken, .. } => Some(*steps_taken),
            TurnState::Idle | TurnState::Error { .. } => None,
        }
    }

    /// Coarse status shown to consumers
    pub fn consumer_status(&self) -> ConsumerStatus {
        match self {
            TurnState::Idle | TurnState::Done { .. } => ConsumerStatus::Idle,
            TurnState::Reasoning { .. } | TurnState::ToolRunning { .. } => {
                ConsumerStatus::Reasoning
            }
            TurnState::StreamingText { .. } => ConsumerStatus::StreamingText,
            TurnState::Error { .. } => ConsumerStatus::Error,
        }
    }
}

/// Immutable per-turn configuration
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub conversation_id: String,
    pub max_steps: u32,
}

impl TurnContext {
    pub fn new(conversation_id: impl Into<String>, max_steps: u32) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            max_steps,
        }
    }
}
