//! Planners decide the assistant's next step
//!
//! A planner sees the prior transcript and the response built so far and
//! returns exactly one [`Step`]. It never touches the transcript itself.

mod keyword;

pub use keyword::KeywordPlanner;

use crate::transcript::{Message, Role};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One unit of assistant work
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    EmitText(String),
    /// `name` is unresolved; the orchestrator checks it against the registry
    CallTool { name: String, args: Value },
    Stop,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlannerError {
    #[error("planner unavailable: {0}")]
    Transport(String),
}

/// Read-only view handed to the planner for each step
#[derive(Debug, Clone, Copy)]
pub struct PlannerView<'a> {
    /// Prior messages, ending with the user message being answered
    pub history: &'a [Message],
    /// The assistant message produced so far in this response
    pub current: &'a Message,
    pub steps_taken: u32,
    pub max_steps: u32,
}

impl PlannerView<'_> {
    /// Text of the user message being answered
    pub fn last_user_text(&self) -> Option<String> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(Message::text_content)
    }

    pub fn steps_remaining(&self) -> u32 {
        self.max_steps.saturating_sub(self.steps_taken)
    }
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_step(&self, view: &PlannerView<'_>) -> Result<Step, PlannerError>;

    fn name(&self) -> &str;
}
