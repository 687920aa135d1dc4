//! Conversation transcript model
//!
//! Messages are ordered sequences of parts. The assistant message that is
//! currently being produced grows through [`TranscriptBuilder`], and every
//! mutation is mirrored as a [`TranscriptEvent`] so a consumer can rebuild the
//! exact same message from the event log.

mod builder;
mod consumer;
mod event;
mod message;

#[cfg(test)]
mod proptests;

pub use builder::{BuilderError, LiveMessage, TranscriptBuilder};
pub use consumer::{ConsumerStatus, Conversation, TranscriptView};
pub use event::TranscriptEvent;
pub use message::{validate_history, HistoryError, Message, Part, PartUpdate, Role, ToolPart, ToolState};
