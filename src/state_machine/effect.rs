//! Effects produced by state transitions

use super::state::{FinishReason, ToolCall};
use crate::tools::ToolName;
use crate::transcript::{Part, PartUpdate, ToolPart};

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the assistant message and announce it
    StartMessage,

    /// Append a part to the assistant message
    AppendPart { part: Part },

    /// Mutate an existing part
    UpdatePart { index: usize, update: PartUpdate },

    /// Deliver `text` into the text part at `part_index` as deltas
    StreamText { part_index: usize, text: String },

    /// Invoke a tool; its part is at `part_index`
    ExecuteTool { part_index: usize, call: ToolCall },

    /// Ask the planner for the next step
    RequestStep,

    /// Abort the running tool
    AbortTool { tool_call_id: String },

    /// Emit the terminal `finish` event
    Finish { reason: FinishReason, steps: u32 },

    /// Emit the terminal `error` event
    Fail { message: String },
}

impl Effect {
    pub fn append_text() -> Self {
        Effect::AppendPart {
            part: Part::text(""),
        }
    }

    pub fn append_tool(tool_call_id: &str, name: ToolName) -> Self {
        Effect::AppendPart {
            part: Part::Tool(ToolPart::streaming(tool_call_id, name)),
        }
    }
}
