//! Streaming assembly of the in-progress assistant message
//!
//! Parts live in an index-addressed arena (`Message::parts`). `append` and
//! `transition` are the only mutations; both return the event describing the
//! change so it can be forwarded to consumers and replayed later.

use super::event::TranscriptEvent;
use super::message::{Message, Part, PartUpdate, ToolState};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

/// Rejected builder mutations
#[derive(Debug, Error, PartialEq)]
pub enum BuilderError {
    #[error("no part at index {index} (message has {len} parts)")]
    NoSuchPart { index: usize, len: usize },
    #[error("part appended at index {got}, expected {expected}")]
    OutOfOrder { expected: usize, got: usize },
    #[error("tool parts must be appended in input-streaming state without payload")]
    NotFresh,
    #[error("illegal tool transition {from:?} -> {to:?}")]
    IllegalTransition { from: ToolState, to: ToolState },
    #[error("partial input is only accepted while input is streaming (state {0:?})")]
    InputClosed(ToolState),
    #[error("update {update} does not apply to a {kind} part")]
    WrongPartKind {
        update: &'static str,
        kind: &'static str,
    },
    #[error("event stream must begin with message-start")]
    NotStarted,
}

impl Message {
    /// Push a part, returning its index
    pub(crate) fn append_part(&mut self, part: Part) -> Result<usize, BuilderError> {
        if let Part::Tool(tool) = &part {
            let fresh = tool.state == ToolState::InputStreaming
                && tool.output.is_none()
                && tool.error_text.is_none();
            if !fresh {
                return Err(BuilderError::NotFresh);
            }
        }
        self.parts.push(part);
        Ok(self.parts.len() - 1)
    }

    /// Apply an index-addressed update, enforcing the tool state progression
    pub(crate) fn update_part(
        &mut self,
        index: usize,
        update: &PartUpdate,
    ) -> Result<(), BuilderError> {
        let len = self.parts.len();
        let part = self
            .parts
            .get_mut(index)
            .ok_or(BuilderError::NoSuchPart { index, len })?;

        match (part, update) {
            (Part::Text { text }, PartUpdate::TextDelta { delta }) => {
                text.push_str(delta);
                Ok(())
            }
            (Part::Text { .. }, _) => Err(BuilderError::WrongPartKind {
                update: update_name(update),
                kind: "text",
            }),
            (Part::Tool(_), PartUpdate::TextDelta { .. }) => Err(BuilderError::WrongPartKind {
                update: "text-delta",
                kind: "tool",
            }),
            (Part::Tool(tool), PartUpdate::InputDelta { input }) => {
                if tool.state != ToolState::InputStreaming {
                    return Err(BuilderError::InputClosed(tool.state));
                }
                tool.input = Some(input.clone());
                Ok(())
            }
            (Part::Tool(tool), update) => {
                let Some(next) = update.target_state() else {
                    return Err(BuilderError::WrongPartKind {
                        update: update_name(update),
                        kind: "tool",
                    });
                };
                if !tool.state.can_advance_to(next) {
                    return Err(BuilderError::IllegalTransition {
                        from: tool.state,
                        to: next,
                    });
                }
                match update {
                    PartUpdate::InputAvailable { input } => tool.input = Some(input.clone()),
                    PartUpdate::OutputAvailable { output } => tool.output = Some(output.clone()),
                    PartUpdate::OutputError { error_text } => {
                        tool.error_text = Some(error_text.clone());
                    }
                    PartUpdate::TextDelta { .. } | PartUpdate::InputDelta { .. } => {}
                }
                tool.state = next;
                Ok(())
            }
        }
    }
}

fn update_name(update: &PartUpdate) -> &'static str {
    match update {
        PartUpdate::TextDelta { .. } => "text-delta",
        PartUpdate::InputDelta { .. } => "input-delta",
        PartUpdate::InputAvailable { .. } => "input-available",
        PartUpdate::OutputAvailable { .. } => "output-available",
        PartUpdate::OutputError { .. } => "output-error",
    }
}

/// Owner of the in-progress assistant message
#[derive(Debug, Clone)]
pub struct TranscriptBuilder {
    message: Message,
}

impl TranscriptBuilder {
    /// Start a new assistant message, returning the builder and its start event
    pub fn start() -> (Self, TranscriptEvent) {
        let message_id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let builder = Self::with_identity(message_id.clone(), created_at);
        (
            builder,
            TranscriptEvent::MessageStart {
                message_id,
                created_at,
            },
        )
    }

    fn with_identity(message_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            message: Message::assistant(message_id, created_at),
        }
    }

    /// All parts produced so far, each in its current state
    pub fn current_message(&self) -> &Message {
        &self.message
    }

    pub fn len(&self) -> usize {
        self.message.parts.len()
    }

    pub fn append(&mut self, part: Part) -> Result<TranscriptEvent, BuilderError> {
        let index = self.message.append_part(part.clone())?;
        Ok(TranscriptEvent::PartAppended { index, part })
    }

    pub fn transition(
        &mut self,
        index: usize,
        update: PartUpdate,
    ) -> Result<TranscriptEvent, BuilderError> {
        self.message.update_part(index, &update)?;
        Ok(TranscriptEvent::PartUpdated { index, update })
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}

#[cfg(test)]
impl TranscriptBuilder {
    /// Apply a previously emitted event. Lifecycle events are ignored.
    pub fn apply(&mut self, event: &TranscriptEvent) -> Result<(), BuilderError> {
        apply_to_message(&mut self.message, event)
    }

    /// Rebuild a message from an ordered event log
    pub fn replay<'a>(
        events: impl IntoIterator<Item = &'a TranscriptEvent>,
    ) -> Result<Message, BuilderError> {
        let mut events = events.into_iter();
        let Some(TranscriptEvent::MessageStart {
            message_id,
            created_at,
        }) = events.next()
        else {
            return Err(BuilderError::NotStarted);
        };
        let mut builder = Self::with_identity(message_id.clone(), *created_at);
        for event in events {
            builder.apply(event)?;
        }
        Ok(builder.into_message())
    }
}

/// Apply a part-level event to a message
pub(crate) fn apply_to_message(
    message: &mut Message,
    event: &TranscriptEvent,
) -> Result<(), BuilderError> {
    match event {
        TranscriptEvent::PartAppended { index, part } => {
            let expected = message.parts.len();
            if *index != expected {
                return Err(BuilderError::OutOfOrder {
                    expected,
                    got: *index,
                });
            }
            message.append_part(part.clone()).map(|_| ())
        }
        TranscriptEvent::PartUpdated { index, update } => message.update_part(*index, update),
        TranscriptEvent::MessageStart { .. }
        | TranscriptEvent::Status { .. }
        | TranscriptEvent::Finish { .. }
        | TranscriptEvent::Error { .. } => Ok(()),
    }
}

/// Read-only handle on the live in-progress message
#[derive(Debug, Clone)]
pub struct LiveMessage {
    rx: watch::Receiver<Option<Message>>,
}

impl LiveMessage {
    pub fn new(rx: watch::Receiver<Option<Message>>) -> Self {
        Self { rx }
    }

    /// Snapshot of the message as it stands right now
    pub fn current_message(&self) -> Option<Message> {
        self.rx.borrow().clone()
    }
}
