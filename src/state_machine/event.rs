//! Events that drive a turn

use super::state::ToolCall;
use serde_json::Value;

/// How a tool invocation settled
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Output(Value),
    /// Human readable failure, becomes the part's `errorText`
    Error(String),
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    UserMessage { text: String },
    UserCancel,

    // Planner events
    TextRequested { text: String },
    ToolRequested { call: ToolCall },
    /// The planner named a tool the registry does not know
    UnknownTool { name: String },
    PlannerStopped,
    PlannerFailed { message: String },

    // Completion events
    TextComplete { part_index: usize },
    ToolComplete {
        part_index: usize,
        outcome: ToolOutcome,
    },

    /// Wall-clock ceiling for the response elapsed
    TimedOut,
}
