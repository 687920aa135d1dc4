//! Mock implementations for testing
//!
//! These mocks let the executor and session manager run without the
//! keyword heuristics or real tool latency.

use super::traits::{RegistryToolExecutor, ToolExecutor};
use crate::planner::{Planner, PlannerError, PlannerView, Step};
use crate::state_machine::ToolOutcome;
use crate::tools::{ToolContext, ToolDefinition, ToolError, ToolName, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted Planner
// ============================================================================

/// Planner that replays queued steps, then stops
pub struct ScriptedPlanner {
    steps: Mutex<VecDeque<Result<Step, PlannerError>>>,
    delay: Option<Duration>,
    /// `steps_taken` seen on each request
    pub seen: Mutex<Vec<u32>>,
}

impl ScriptedPlanner {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().map(Ok).collect()),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a transport failure after the steps already queued
    pub fn queue_error(&self, message: &str) {
        self.steps
            .lock()
            .unwrap()
            .push_back(Err(PlannerError::Transport(message.to_string())));
    }

    /// Number of requests made so far
    pub fn requests(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn next_step(&self, view: &PlannerView<'_>) -> Result<Step, PlannerError> {
        self.seen.lock().unwrap().push(view.steps_taken);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Step::Stop))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Delayed Tool Executor
// ============================================================================

/// Registry-backed executor that holds every call for `delay`
pub struct DelayedToolExecutor {
    inner: RegistryToolExecutor,
    delay: Duration,
    /// Signalled when a tool call begins
    pub started: Arc<Notify>,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl DelayedToolExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: RegistryToolExecutor::new(Arc::new(ToolRegistry::standard().unwrap())),
            delay,
            started: Arc::new(Notify::new()),
            tokens: Mutex::new(Vec::new()),
        }
    }

    /// Cancellation token handed to the most recent call
    pub fn last_token(&self) -> Option<CancellationToken> {
        self.tokens.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ToolExecutor for DelayedToolExecutor {
    fn resolve(&self, name: &str) -> Result<ToolName, ToolError> {
        self.inner.resolve(name)
    }

    async fn execute(&self, name: ToolName, input: Value, ctx: ToolContext) -> ToolOutcome {
        let cancel = ctx.cancel.clone();
        self.tokens.lock().unwrap().push(cancel.clone());
        self.started.notify_one();
        tokio::select! {
            () = cancel.cancelled() => ToolOutcome::Error("cancelled".to_string()),
            () = tokio::time::sleep(self.delay) => self.inner.execute(name, input, ctx).await,
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.inner.definitions()
    }
}
