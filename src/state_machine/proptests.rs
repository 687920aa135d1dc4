//! Property-based tests for the state machine
//!
//! A small driver plays the executor's role: it answers every effect with
//! the event the runtime would produce, choosing planner decisions and tool
//! outcomes from the generated script.

use super::*;
use crate::tools::ToolName;
use crate::transcript::Part;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// What the planner does when asked for a step
#[derive(Debug, Clone)]
enum Decision {
    Text(String),
    Tool(ToolName),
    Unknown,
    Stop,
    Fail,
}

fn arb_tool_name() -> impl Strategy<Value = ToolName> {
    prop::sample::select(ToolName::ALL.to_vec())
}

fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![
        4 => "[a-zA-Z ]{0,20}".prop_map(Decision::Text),
        4 => arb_tool_name().prop_map(Decision::Tool),
        1 => Just(Decision::Unknown),
        1 => Just(Decision::Stop),
        1 => Just(Decision::Fail),
    ]
}

fn arb_outcome() -> impl Strategy<Value = ToolOutcome> {
    prop_oneof![
        Just(ToolOutcome::Output(json!({"ok": true}))),
        "[a-z ]{1,20}".prop_map(ToolOutcome::Error),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        (0u32..7, 0usize..7).prop_map(|(steps_taken, parts)| TurnState::Reasoning {
            steps_taken,
            parts
        }),
        (1u32..7, 0usize..7).prop_map(|(steps_taken, part_index)| TurnState::StreamingText {
            steps_taken,
            part_index
        }),
        (1u32..7, 0usize..7, arb_tool_name()).prop_map(|(steps_taken, part_index, name)| {
            TurnState::ToolRunning {
                steps_taken,
                part_index,
                call: ToolCall::new("c", name, json!({})),
            }
        }),
    ]
}

// ============================================================================
// Driver
// ============================================================================

/// Everything a run produced
struct Trace {
    states: Vec<TurnState>,
    effects: Vec<Effect>,
}

fn drive(
    max_steps: u32,
    decisions: &[Decision],
    outcomes: &[ToolOutcome],
    cancel_after: Option<usize>,
) -> Trace {
    let context = TurnContext::new("prop-conv", max_steps);
    let mut state = TurnState::Idle;
    let mut trace = Trace {
        states: vec![],
        effects: vec![],
    };
    let mut pending = vec![Event::UserMessage {
        text: "go".to_string(),
    }];
    let mut decisions = decisions.iter().cycle();
    let mut outcomes = outcomes.iter().cycle();
    let mut handled = 0usize;

    while let Some(event) = pending.pop() {
        let event = if cancel_after == Some(handled) && state.is_busy() {
            Event::UserCancel
        } else {
            event
        };
        handled += 1;

        let result = transition(&state, &context, event).expect("driver produced a valid event");
        state = result.new_state;
        trace.states.push(state.clone());

        for effect in result.effects {
            match &effect {
                Effect::RequestStep => {
                    let next = match decisions.next().expect("non-empty decisions") {
                        Decision::Text(text) => Event::TextRequested { text: text.clone() },
                        Decision::Tool(name) => Event::ToolRequested {
                            call: ToolCall::new(format!("call-{handled}"), *name, json!({})),
                        },
                        Decision::Unknown => Event::UnknownTool {
                            name: "teleport".to_string(),
                        },
                        Decision::Stop => Event::PlannerStopped,
                        Decision::Fail => Event::PlannerFailed {
                            message: "connection reset".to_string(),
                        },
                    };
                    pending.push(next);
                }
                Effect::StreamText { part_index, .. } => {
                    pending.push(Event::TextComplete {
                        part_index: *part_index,
                    });
                }
                Effect::ExecuteTool { part_index, .. } => {
                    pending.push(Event::ToolComplete {
                        part_index: *part_index,
                        outcome: outcomes.next().expect("non-empty outcomes").clone(),
                    });
                }
                _ => {}
            }
            trace.effects.push(effect);
        }
    }

    trace
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every run terminates within the step cap
    #[test]
    fn prop_steps_never_exceed_cap(
        max_steps in 1u32..10,
        decisions in prop::collection::vec(arb_decision(), 1..12),
        outcomes in prop::collection::vec(arb_outcome(), 1..4),
        cancel_after in prop::option::of(0usize..20),
    ) {
        let trace = drive(max_steps, &decisions, &outcomes, cancel_after);
        for state in &trace.states {
            if let Some(steps) = state.steps_taken() {
                prop_assert!(steps <= max_steps, "state {:?} over cap {}", state, max_steps);
            }
        }
        let last = trace.states.last().expect("at least one transition");
        prop_assert!(last.is_finished(), "run ended in {:?}", last);
    }

    /// Exactly one terminal effect, and it is the last one
    #[test]
    fn prop_single_terminal_effect(
        max_steps in 1u32..10,
        decisions in prop::collection::vec(arb_decision(), 1..12),
        outcomes in prop::collection::vec(arb_outcome(), 1..4),
        cancel_after in prop::option::of(0usize..20),
    ) {
        let trace = drive(max_steps, &decisions, &outcomes, cancel_after);
        let terminal: Vec<_> = trace
            .effects
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Effect::Finish { .. } | Effect::Fail { .. }))
            .collect();
        prop_assert_eq!(terminal.len(), 1);
        prop_assert_eq!(terminal[0].0, trace.effects.len() - 1);
    }

    /// Parts are appended at consecutive indices and updates only touch
    /// parts that exist
    #[test]
    fn prop_part_indices_are_sequential(
        max_steps in 1u32..10,
        decisions in prop::collection::vec(arb_decision(), 1..12),
        outcomes in prop::collection::vec(arb_outcome(), 1..4),
    ) {
        let trace = drive(max_steps, &decisions, &outcomes, None);
        let mut parts = 0usize;
        for effect in &trace.effects {
            match effect {
                Effect::AppendPart { part } => {
                    if let Part::Tool(tool) = part {
                        prop_assert_eq!(tool.state, crate::transcript::ToolState::InputStreaming);
                    }
                    parts += 1;
                }
                Effect::UpdatePart { index, .. }
                | Effect::StreamText { part_index: index, .. }
                | Effect::ExecuteTool { part_index: index, .. } => {
                    prop_assert!(*index < parts);
                }
                _ => {}
            }
        }
    }

    /// A user message while a response is in flight is always rejected
    #[test]
    fn prop_busy_rejects_user_message(state in arb_busy_state(), text in "[a-z]{1,10}") {
        let result = transition(&state, &TurnContext::new("c", 7), Event::UserMessage { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::AgentBusy);
    }

    /// Cancelling never settles a tool part
    #[test]
    fn prop_cancel_never_updates_parts(state in arb_busy_state()) {
        let result = transition(&state, &TurnContext::new("c", 7), Event::UserCancel).unwrap();
        let untouched = result
            .effects
            .iter()
            .all(|e| !matches!(e, Effect::UpdatePart { .. }));
        prop_assert!(untouched);
        let is_cancelled = matches!(
            result.new_state,
            TurnState::Done { reason: FinishReason::Cancelled, .. }
        );
        prop_assert!(is_cancelled);
    }
}
