//! Turn executor
//!
//! Runs one assistant response: feeds events through the pure transition
//! function, executes the returned effects and waits on the planner, a tool
//! or the text stream. Cancellation and the response deadline are raced
//! against every wait.

use super::traits::ToolExecutor;
use crate::config::MAX_TURN_TIMEOUT;
use crate::planner::{Planner, PlannerView, Step};
use crate::state_machine::{
    transition, Effect, ErrorKind, Event, ToolCall, TransitionError, TransitionResult,
    TurnContext, TurnState,
};
use crate::tools::ToolContext;
use crate::transcript::{
    BuilderError, Conversation, Message, PartUpdate, TranscriptBuilder,
    TranscriptEvent, TranscriptView,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Work the executor waits on between transitions
#[derive(Debug)]
enum Pending {
    Step,
    Text { part_index: usize, text: String },
    Tool { part_index: usize, call: ToolCall },
}

/// Where a running turn publishes its progress
pub struct TurnChannels {
    /// Ordered transcript events for the transport
    pub events: mpsc::Sender<TranscriptEvent>,
    /// Snapshot of the message being built
    pub live: watch::Sender<Option<Message>>,
    pub state: watch::Sender<TurnState>,
}

/// Final state and message of a finished response
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub state: TurnState,
    pub message: Message,
    /// Tool parts that produced output, as a consumer of the stream counts them
    pub tool_runs: usize,
    /// Last error a consumer of the stream was shown
    pub error: Option<String>,
}

/// Generic turn executor that can work with any planner and tool implementations
pub struct TurnExecutor<P, T>
where
    P: Planner + ?Sized,
    T: ToolExecutor + ?Sized,
{
    context: TurnContext,
    state: TurnState,
    /// Prior transcript plus the user message being answered
    history: Vec<Message>,
    planner: Arc<P>,
    tools: Arc<T>,
    builder: TranscriptBuilder,
    /// Handed out by `Effect::StartMessage`
    start_event: Option<TranscriptEvent>,
    channels: TurnChannels,
    /// Every emitted event folded the way a client folds it
    view: Conversation,
    cancel: CancellationToken,
    /// Token for the running tool, cancelled by `Effect::AbortTool`
    tool_cancel: Option<CancellationToken>,
    deadline: Instant,
}

impl<P, T> TurnExecutor<P, T>
where
    P: Planner + ?Sized,
    T: ToolExecutor + ?Sized,
{
    pub fn new(
        context: TurnContext,
        history: Vec<Message>,
        planner: Arc<P>,
        tools: Arc<T>,
        channels: TurnChannels,
        cancel: CancellationToken,
        timeout: Duration,
    ) -> Self {
        let (builder, start_event) = TranscriptBuilder::start();
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + MAX_TURN_TIMEOUT);
        let view = Conversation::from_messages(history.clone());
        Self {
            context,
            state: TurnState::Idle,
            history,
            planner,
            tools,
            builder,
            start_event: Some(start_event),
            channels,
            view,
            cancel,
            tool_cancel: None,
            deadline,
        }
    }

    /// Drive the response to `Done` or `Error`
    pub async fn run(mut self, text: String) -> TurnReport {
        tracing::info!(
            conv_id = %self.context.conversation_id,
            planner = self.planner.name(),
            max_steps = self.context.max_steps,
            "Starting response"
        );

        let mut next = Some(Event::UserMessage { text });
        while let Some(event) = next.take() {
            match self.process_event(event).await {
                Ok(Some(work)) => next = Some(self.wait_for(work).await),
                Ok(None) => {}
                Err(message) => self.fail_internal(message).await,
            }
        }

        let unsettled = self
            .builder
            .current_message()
            .tool_parts()
            .filter(|tool| !tool.state.is_terminal())
            .count();
        tracing::info!(
            conv_id = %self.context.conversation_id,
            state = ?self.state,
            parts = self.builder.len(),
            unsettled_tools = unsettled,
            "Response finished"
        );

        TurnReport {
            state: self.state,
            tool_runs: self.view.tool_runs(),
            error: self.view.last_error().map(str::to_string),
            message: self.builder.into_message(),
        }
    }

    async fn process_event(&mut self, event: Event) -> Result<Option<Pending>, String> {
        let TransitionResult { new_state, effects } =
            transition(&self.state, &self.context, event).map_err(rejected_event)?;

        self.state = new_state;
        self.channels.state.send_replace(self.state.clone());

        let mut pending = None;
        for effect in effects {
            if let Some(work) = self.execute_effect(effect).await? {
                pending = Some(work);
            }
        }

        self.publish_status().await;
        Ok(pending)
    }

    /// Execute an effect, returning work to wait on
    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Pending>, String> {
        match effect {
            Effect::StartMessage => {
                if let Some(start) = self.start_event.take() {
                    self.emit(start).await;
                }
                self.publish_snapshot();
                Ok(None)
            }

            Effect::AppendPart { part } => {
                let event = self.builder.append(part).map_err(rejected_update)?;
                self.emit(event).await;
                self.publish_snapshot();
                Ok(None)
            }

            Effect::UpdatePart { index, update } => {
                let event = self
                    .builder
                    .transition(index, update)
                    .map_err(rejected_update)?;
                self.emit(event).await;
                self.publish_snapshot();
                Ok(None)
            }

            Effect::StreamText { part_index, text } => Ok(Some(Pending::Text { part_index, text })),

            Effect::ExecuteTool { part_index, call } => {
                tracing::info!(
                    conv_id = %self.context.conversation_id,
                    tool = %call.name,
                    tool_call_id = %call.id,
                    "Executing tool"
                );
                Ok(Some(Pending::Tool { part_index, call }))
            }

            Effect::RequestStep => Ok(Some(Pending::Step)),

            Effect::AbortTool { tool_call_id } => {
                tracing::info!(
                    conv_id = %self.context.conversation_id,
                    tool_call_id = %tool_call_id,
                    "Aborting tool"
                );
                if let Some(token) = self.tool_cancel.take() {
                    token.cancel();
                }
                Ok(None)
            }

            Effect::Finish { reason, steps } => {
                self.emit(TranscriptEvent::Finish {
                    finish_reason: reason,
                    steps,
                })
                .await;
                Ok(None)
            }

            Effect::Fail { message } => {
                tracing::warn!(
                    conv_id = %self.context.conversation_id,
                    error = %message,
                    "Response failed"
                );
                self.emit(TranscriptEvent::Error {
                    error_text: message,
                })
                .await;
                Ok(None)
            }
        }
    }

    /// Wait for `work`, unless the response is cancelled or times out first
    async fn wait_for(&mut self, work: Pending) -> Event {
        let cancel = self.cancel.clone();
        let deadline = self.deadline;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Event::UserCancel,
            () = tokio::time::sleep_until(deadline) => {
                tracing::warn!(conv_id = %self.context.conversation_id, "Response timed out");
                Event::TimedOut
            }
            event = self.perform(work) => event,
        }
    }

    async fn perform(&mut self, work: Pending) -> Event {
        match work {
            Pending::Step => self.plan().await,
            Pending::Text { part_index, text } => self.stream_text(part_index, &text).await,
            Pending::Tool { part_index, call } => {
                let token = self.cancel.child_token();
                self.tool_cancel = Some(token.clone());
                let ctx = ToolContext::new(token, self.context.conversation_id.clone());
                let outcome = self.tools.execute(call.name, call.input, ctx).await;
                self.tool_cancel = None;
                Event::ToolComplete {
                    part_index,
                    outcome,
                }
            }
        }
    }

    /// Ask the planner for one step and translate it into an event
    async fn plan(&self) -> Event {
        let view = PlannerView {
            history: &self.history,
            current: self.builder.current_message(),
            steps_taken: self.state.steps_taken().unwrap_or_default(),
            max_steps: self.context.max_steps,
        };

        match self.planner.next_step(&view).await {
            Ok(Step::EmitText(text)) => Event::TextRequested { text },
            Ok(Step::CallTool { name, args }) => match self.tools.resolve(&name) {
                Ok(tool) => Event::ToolRequested {
                    call: ToolCall::new(uuid::Uuid::new_v4().to_string(), tool, args),
                },
                Err(e) => {
                    tracing::warn!(conv_id = %self.context.conversation_id, error = %e, "Planner requested unknown tool");
                    Event::UnknownTool { name }
                }
            },
            Ok(Step::Stop) => Event::PlannerStopped,
            Err(e) => Event::PlannerFailed {
                message: e.to_string(),
            },
        }
    }

    /// Deliver text word by word, yielding between deltas
    ///
    /// A channel slot is reserved before the builder is touched, so dropping
    /// this future never leaves an applied delta unannounced.
    async fn stream_text(&mut self, part_index: usize, text: &str) -> Event {
        for delta in text.split_inclusive(' ') {
            let Ok(permit) = self.channels.events.reserve().await else {
                tracing::debug!(conv_id = %self.context.conversation_id, "Event receiver dropped");
                return Event::UserCancel;
            };
            let update = PartUpdate::TextDelta {
                delta: delta.to_string(),
            };
            match self.builder.transition(part_index, update) {
                Ok(event) => {
                    observe(&mut self.view, &self.context.conversation_id, &event);
                    permit.send(event);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Text delta rejected");
                    break;
                }
            }
            self.publish_snapshot();
            tokio::task::yield_now().await;
        }
        Event::TextComplete { part_index }
    }

    /// Move to `Error` after an executor inconsistency
    async fn fail_internal(&mut self, message: String) {
        tracing::error!(conv_id = %self.context.conversation_id, error = %message, "Executor error");
        self.state = TurnState::Error {
            message: message.clone(),
            kind: ErrorKind::Internal,
        };
        self.channels.state.send_replace(self.state.clone());
        self.emit(TranscriptEvent::Error {
            error_text: message,
        })
        .await;
    }

    /// Forward an event, giving up once the response is cancelled or past
    /// its deadline and the consumer is not draining the channel
    async fn emit(&mut self, event: TranscriptEvent) {
        observe(&mut self.view, &self.context.conversation_id, &event);
        let kind = event.kind();
        tokio::select! {
            biased;
            sent = self.channels.events.send(event) => {
                if sent.is_err() {
                    tracing::debug!(conv_id = %self.context.conversation_id, "Event receiver dropped");
                }
            }
            () = self.cancel.cancelled() => {
                tracing::debug!(conv_id = %self.context.conversation_id, kind, "Event dropped after cancellation");
            }
            () = tokio::time::sleep_until(self.deadline) => {
                tracing::warn!(conv_id = %self.context.conversation_id, kind, "Event dropped, consumer stalled past deadline");
            }
        }
    }

    fn publish_snapshot(&self) {
        self.channels
            .live
            .send_replace(Some(self.builder.current_message().clone()));
    }

    /// Announce phase changes while the response is in flight
    async fn publish_status(&mut self) {
        let status = self.state.consumer_status();
        if !self.state.is_busy() || status == self.view.status() {
            return;
        }
        self.emit(TranscriptEvent::Status { status }).await;
    }
}

/// Fold an outgoing event into the client-side view
fn observe(view: &mut Conversation, conv_id: &str, event: &TranscriptEvent) {
    if let Err(e) = view.apply(event) {
        tracing::error!(conv_id = %conv_id, error = %e, "Event stream diverged from transcript");
    }
}

fn rejected_event(err: TransitionError) -> String {
    format!("state machine rejected event: {err}")
}

fn rejected_update(err: BuilderError) -> String {
    format!("transcript rejected update: {err}")
}
