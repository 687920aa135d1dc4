//! Runtime for executing assistant responses
//!
//! The session manager owns at most one in-flight response per
//! conversation. Each response runs on its own task and streams its
//! transcript events back to the caller.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{TurnChannels, TurnExecutor};
pub use traits::{RegistryToolExecutor, ToolExecutor};

use crate::config::TurnConfig;
use crate::planner::Planner;
use crate::state_machine::{TurnContext, TurnState};
use crate::tools::ToolDefinition;
use crate::transcript::{
    validate_history, ConsumerStatus, HistoryError, LiveMessage, Message, TranscriptEvent,
};
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Type alias for the production executor with trait-object seams
pub type ProductionExecutor = TurnExecutor<dyn Planner, dyn ToolExecutor>;

/// Transcript events buffered between a response and its transport
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("A response is already in progress for conversation {0}")]
    AgentBusy(String),
    #[error("No active response for conversation {0}")]
    NotFound(String),
    #[error("Message text must not be empty")]
    EmptyMessage,
    #[error("Invalid history: {0}")]
    InvalidHistory(#[from] HistoryError),
}

/// Bookkeeping for an in-flight response
struct ActiveTurn {
    turn_id: String,
    cancel: CancellationToken,
    live: LiveMessage,
    state: watch::Receiver<TurnState>,
}

/// Point-in-time view of a conversation's response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnSnapshot {
    pub conversation_id: String,
    pub state: TurnState,
    pub status: ConsumerStatus,
    pub message: Option<Message>,
}

/// Ordered transcript events of one response
///
/// The stream ends with the first `finish` or `error` event. Dropping it
/// cancels the response.
pub struct TurnStream {
    events: ReceiverStream<TranscriptEvent>,
    finished: bool,
    _guard: DropGuard,
}

impl Stream for TurnStream {
    type Item = TranscriptEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let polled = Pin::new(&mut self.events).poll_next(cx);
        if let Poll::Ready(Some(event)) = &polled {
            self.finished = event.is_terminal();
        }
        polled
    }
}

/// Manager for all in-flight responses
pub struct SessionManager {
    planner: Arc<dyn Planner>,
    tools: Arc<dyn ToolExecutor>,
    config: TurnConfig,
    turns: RwLock<HashMap<String, ActiveTurn>>,
}

impl SessionManager {
    pub fn new(planner: Arc<dyn Planner>, tools: Arc<dyn ToolExecutor>, config: TurnConfig) -> Self {
        Self {
            planner,
            tools,
            config,
            turns: RwLock::new(HashMap::new()),
        }
    }

    /// Start answering `text` in `conversation_id`
    ///
    /// `history` is the conversation so far, excluding the new message.
    pub async fn start_turn(
        self: &Arc<Self>,
        conversation_id: &str,
        mut history: Vec<Message>,
        text: &str,
    ) -> Result<TurnStream, RuntimeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RuntimeError::EmptyMessage);
        }
        validate_history(&history)?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (live_tx, live_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);
        let cancel = CancellationToken::new();
        let turn_id = uuid::Uuid::new_v4().to_string();

        {
            let mut turns = self.turns.write().await;
            if let Some(existing) = turns.get(conversation_id) {
                // A finished turn may not have released its slot yet
                if !existing.state.borrow().is_finished() {
                    return Err(RuntimeError::AgentBusy(conversation_id.to_string()));
                }
            }
            turns.insert(
                conversation_id.to_string(),
                ActiveTurn {
                    turn_id: turn_id.clone(),
                    cancel: cancel.clone(),
                    live: LiveMessage::new(live_rx),
                    state: state_rx,
                },
            );
        }

        history.push(Message::user(text));
        let executor: ProductionExecutor = TurnExecutor::new(
            TurnContext::new(conversation_id, self.config.max_steps),
            history,
            Arc::clone(&self.planner),
            Arc::clone(&self.tools),
            TurnChannels {
                events: events_tx,
                live: live_tx,
                state: state_tx,
            },
            cancel.clone(),
            self.config.timeout,
        );

        let manager = Arc::clone(self);
        let conv_id = conversation_id.to_string();
        let text = text.to_string();
        tokio::spawn(async move {
            let report = executor.run(text).await;
            manager.release(&conv_id, &turn_id).await;
            tracing::info!(
                conv_id = %conv_id,
                state = ?report.state,
                tool_parts = report.message.tool_parts().count(),
                tool_runs = report.tool_runs,
                error = report.error.as_deref(),
                "Response released"
            );
        });

        Ok(TurnStream {
            events: ReceiverStream::new(events_rx),
            finished: false,
            _guard: cancel.drop_guard(),
        })
    }

    /// Request cancellation of the in-flight response
    pub async fn cancel(&self, conversation_id: &str) -> Result<(), RuntimeError> {
        let turns = self.turns.read().await;
        let turn = turns
            .get(conversation_id)
            .ok_or_else(|| RuntimeError::NotFound(conversation_id.to_string()))?;
        tracing::info!(conv_id = %conversation_id, "Cancellation requested");
        turn.cancel.cancel();
        Ok(())
    }

    /// Current state and partial message of the in-flight response
    pub async fn snapshot(&self, conversation_id: &str) -> Result<TurnSnapshot, RuntimeError> {
        let turns = self.turns.read().await;
        let turn = turns
            .get(conversation_id)
            .ok_or_else(|| RuntimeError::NotFound(conversation_id.to_string()))?;
        let state = turn.state.borrow().clone();
        Ok(TurnSnapshot {
            conversation_id: conversation_id.to_string(),
            status: state.consumer_status(),
            state,
            message: turn.live.current_message(),
        })
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    pub fn planner_name(&self) -> &str {
        self.planner.name()
    }

    /// Drop the bookkeeping for a finished turn unless a newer one took over
    async fn release(&self, conversation_id: &str, turn_id: &str) {
        let mut turns = self.turns.write().await;
        if turns
            .get(conversation_id)
            .is_some_and(|turn| turn.turn_id == turn_id)
        {
            turns.remove(conversation_id);
        }
    }
}
