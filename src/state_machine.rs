//! Turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! planner, tools and transport only ever talk to the turn through `Event`s,
//! and everything the turn wants done comes back as `Effect`s.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, ToolOutcome};
pub use state::{ErrorKind, DEFAULT_MAX_STEPS, FinishReason, ToolCall, TurnContext, TurnState};
pub use transition::{transition, TransitionError, TransitionResult};
