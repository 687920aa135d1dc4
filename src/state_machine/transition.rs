//! Pure state transition function

use super::{Effect, ErrorKind, Event, FinishReason, ToolOutcome, TurnContext, TurnState};
use crate::transcript::PartUpdate;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Agent is busy, cannot accept message (cancel current response first)")]
    AgentBusy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// expressed through the returned effects.
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Message Handling
        // ============================================================

        // Idle/Done/Error + UserMessage -> Reasoning
        (
            TurnState::Idle | TurnState::Done { .. } | TurnState::Error { .. },
            Event::UserMessage { .. },
        ) => Ok(TransitionResult::new(TurnState::Reasoning {
            steps_taken: 0,
            parts: 0,
        })
        .with_effect(Effect::StartMessage)
        .with_effect(Effect::RequestStep)),

        (_, Event::UserMessage { .. }) => Err(TransitionError::AgentBusy),

        // ============================================================
        // Planner Steps
        // ============================================================

        // Reasoning + TextRequested -> StreamingText
        (TurnState::Reasoning { steps_taken, parts }, Event::TextRequested { text }) => {
            Ok(TransitionResult::new(TurnState::StreamingText {
                steps_taken: steps_taken + 1,
                part_index: *parts,
            })
            .with_effect(Effect::append_text())
            .with_effect(Effect::StreamText {
                part_index: *parts,
                text,
            }))
        }

        // Reasoning + ToolRequested -> ToolRunning
        //
        // The part is announced in input-streaming and immediately receives
        // its full arguments, so it executes from input-available.
        (TurnState::Reasoning { steps_taken, parts }, Event::ToolRequested { call }) => {
            Ok(TransitionResult::new(TurnState::ToolRunning {
                steps_taken: steps_taken + 1,
                part_index: *parts,
                call: call.clone(),
            })
            .with_effect(Effect::append_tool(&call.id, call.name))
            .with_effect(Effect::UpdatePart {
                index: *parts,
                update: PartUpdate::InputAvailable {
                    input: call.input.clone(),
                },
            })
            .with_effect(Effect::ExecuteTool {
                part_index: *parts,
                call,
            }))
        }

        // Reasoning + PlannerStopped -> Done (the stop is itself a step)
        (TurnState::Reasoning { steps_taken, .. }, Event::PlannerStopped) => {
            Ok(finish(FinishReason::Stop, steps_taken + 1))
        }

        // Reasoning + UnknownTool -> Error; nothing is appended for the name
        (TurnState::Reasoning { .. }, Event::UnknownTool { name }) => Ok(fail(
            format!("The assistant requested an unknown tool: {name}"),
            ErrorKind::UnknownTool,
        )),

        // Reasoning + PlannerFailed -> Error, no retry
        (TurnState::Reasoning { .. }, Event::PlannerFailed { message }) => {
            Ok(fail(message, ErrorKind::Transport))
        }

        // ============================================================
        // Step Completion
        // ============================================================

        (
            TurnState::StreamingText {
                steps_taken,
                part_index,
            },
            Event::TextComplete {
                part_index: completed,
            },
        ) if *part_index == completed => Ok(next_step(context, *steps_taken, completed + 1)),

        // ToolRunning + ToolComplete -> settle the part; failures are data
        (
            TurnState::ToolRunning {
                steps_taken,
                part_index,
                ..
            },
            Event::ToolComplete {
                part_index: completed,
                outcome,
            },
        ) if *part_index == completed => {
            let update = match outcome {
                ToolOutcome::Output(output) => PartUpdate::OutputAvailable { output },
                ToolOutcome::Error(error_text) => PartUpdate::OutputError { error_text },
            };
            let mut result = next_step(context, *steps_taken, completed + 1);
            result.effects.insert(
                0,
                Effect::UpdatePart {
                    index: completed,
                    update,
                },
            );
            Ok(result)
        }

        // ============================================================
        // Cancellation and Timeout
        // ============================================================

        // Parts stay exactly as they are; a tool part may stay in
        // input-available.
        (
            TurnState::Reasoning { steps_taken, .. }
            | TurnState::StreamingText { steps_taken, .. },
            event @ (Event::UserCancel | Event::TimedOut),
        ) => Ok(finish(interrupt_reason(&event), *steps_taken)),

        (
            TurnState::ToolRunning {
                steps_taken, call, ..
            },
            event @ (Event::UserCancel | Event::TimedOut),
        ) => {
            let mut result = finish(interrupt_reason(&event), *steps_taken);
            result.effects.insert(
                0,
                Effect::AbortTool {
                    tool_call_id: call.id.clone(),
                },
            );
            Ok(result)
        }

        // Nothing in flight to interrupt
        (
            TurnState::Idle | TurnState::Done { .. } | TurnState::Error { .. },
            Event::UserCancel | Event::TimedOut,
        ) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Anything else is a bug in the caller
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

/// After a completed step: stop at the cap, otherwise ask for another step
fn next_step(context: &TurnContext, steps_taken: u32, parts: usize) -> TransitionResult {
    if steps_taken >= context.max_steps {
        return finish(FinishReason::StepLimit, steps_taken);
    }
    TransitionResult::new(TurnState::Reasoning { steps_taken, parts }).with_effect(Effect::RequestStep)
}

fn finish(reason: FinishReason, steps_taken: u32) -> TransitionResult {
    TransitionResult::new(TurnState::Done {
        reason,
        steps_taken,
    })
    .with_effect(Effect::Finish {
        reason,
        steps: steps_taken,
    })
}

fn fail(message: String, kind: ErrorKind) -> TransitionResult {
    TransitionResult::new(TurnState::Error {
        message: message.clone(),
        kind,
    })
    .with_effect(Effect::Fail { message })
}

fn interrupt_reason(event: &Event) -> FinishReason {
    if matches!(event, Event::TimedOut) {
        FinishReason::Timeout
    } else {
        FinishReason::Cancelled
    }
}
