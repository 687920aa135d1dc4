//! Property-based tests for transcript assembly
//!
//! Arbitrary operation sequences are thrown at the builder, legal or not.
//! Rejected operations must leave the message untouched.

use super::*;
use crate::tools::ToolName;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Op {
    AppendText(String),
    AppendTool(ToolName),
    /// Update the part at `index % len`
    Update(usize, PartUpdate),
    /// Update a part that does not exist
    Stray(PartUpdate),
}

fn arb_update() -> impl Strategy<Value = PartUpdate> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(|delta| PartUpdate::TextDelta { delta }),
        "[a-z]{0,6}".prop_map(|s| PartUpdate::InputDelta {
            input: json!({ "location": s })
        }),
        "[a-z]{1,6}".prop_map(|s| PartUpdate::InputAvailable {
            input: json!({ "location": s })
        }),
        any::<i32>().prop_map(|n| PartUpdate::OutputAvailable {
            output: json!({ "value": n })
        }),
        "[a-z ]{1,12}".prop_map(|error_text| PartUpdate::OutputError { error_text }),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => "[a-z ]{0,8}".prop_map(Op::AppendText),
        2 => prop::sample::select(ToolName::ALL.to_vec()).prop_map(Op::AppendTool),
        6 => (any::<usize>(), arb_update()).prop_map(|(i, u)| Op::Update(i, u)),
        1 => arb_update().prop_map(Op::Stray),
    ]
}

/// Apply one op, returning the emitted event if it was accepted
fn apply(builder: &mut TranscriptBuilder, op: &Op, counter: usize) -> Option<TranscriptEvent> {
    match op {
        Op::AppendText(text) => builder.append(Part::text(text.clone())).ok(),
        Op::AppendTool(name) => builder
            .append(Part::Tool(ToolPart::streaming(format!("call-{counter}"), *name)))
            .ok(),
        Op::Update(i, update) => {
            let len = builder.len();
            if len == 0 {
                return None;
            }
            builder.transition(i % len, update.clone()).ok()
        }
        Op::Stray(update) => {
            let len = builder.len();
            builder.transition(len, update.clone()).ok()
        }
    }
}

/// `new` is `old` with parts only grown or advanced
fn is_extension(old: &Message, new: &Message) -> bool {
    if new.parts.len() < old.parts.len() {
        return false;
    }
    old.parts.iter().zip(&new.parts).all(|(before, after)| match (before, after) {
        (Part::Text { text: a }, Part::Text { text: b }) => b.starts_with(a.as_str()),
        (Part::Tool(a), Part::Tool(b)) => {
            a.tool_call_id == b.tool_call_id
                && a.tool_name == b.tool_name
                && (a.state == b.state || a.state.can_advance_to(b.state))
                && (!a.state.is_terminal() || a == b)
        }
        _ => false,
    })
}

const LEGAL_CHAINS: [[ToolState; 3]; 2] = [
    [
        ToolState::InputStreaming,
        ToolState::InputAvailable,
        ToolState::OutputAvailable,
    ],
    [
        ToolState::InputStreaming,
        ToolState::InputAvailable,
        ToolState::OutputError,
    ],
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Snapshots only ever grow; rejected ops change nothing
    #[test]
    fn prop_current_message_is_monotonic(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (mut builder, _) = TranscriptBuilder::start();
        for (counter, op) in ops.iter().enumerate() {
            let before = builder.current_message().clone();
            let accepted = apply(&mut builder, op, counter).is_some();
            let after = builder.current_message();
            prop_assert!(is_extension(&before, after), "{:?} shrank the message", op);
            if !accepted {
                prop_assert_eq!(&before, after);
            }
        }
    }

    /// Each tool part's observed states form a prefix of a legal chain
    #[test]
    fn prop_tool_states_follow_legal_chain(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (mut builder, _) = TranscriptBuilder::start();
        let mut histories: Vec<Vec<ToolState>> = Vec::new();

        for (counter, op) in ops.iter().enumerate() {
            apply(&mut builder, op, counter);
            let parts = &builder.current_message().parts;
            histories.resize(parts.len(), Vec::new());
            for (history, part) in histories.iter_mut().zip(parts) {
                if let Part::Tool(tool) = part {
                    if history.last() != Some(&tool.state) {
                        history.push(tool.state);
                    }
                }
            }
        }

        for history in histories.iter().filter(|h| !h.is_empty()) {
            let legal = LEGAL_CHAINS
                .iter()
                .any(|chain| chain.starts_with(history));
            prop_assert!(legal, "illegal tool history {:?}", history);
        }
    }

    /// Replaying the accepted events rebuilds the live message exactly
    #[test]
    fn prop_replay_matches_live(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (mut builder, start) = TranscriptBuilder::start();
        let mut events = vec![start];
        for (counter, op) in ops.iter().enumerate() {
            if let Some(event) = apply(&mut builder, op, counter) {
                events.push(event);
            }
        }

        let replayed = TranscriptBuilder::replay(&events).unwrap();
        prop_assert_eq!(&replayed, builder.current_message());

        let mut conversation = Conversation::default();
        for event in &events {
            conversation.apply(event).unwrap();
        }
        prop_assert_eq!(&conversation.messages()[0], builder.current_message());
    }
}
