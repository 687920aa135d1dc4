//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::state_machine::ToolOutcome;
use crate::tools::{ToolContext, ToolDefinition, ToolError, ToolName, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Map a planner-supplied name onto a registered tool
    fn resolve(&self, name: &str) -> Result<ToolName, ToolError>;

    /// Validate and run a tool; failures come back as data
    async fn execute(&self, name: ToolName, input: Value, ctx: ToolContext) -> ToolOutcome;

    /// Get tool definitions for planners and clients
    fn definitions(&self) -> Vec<ToolDefinition>;
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Tool executor backed by the shared registry
pub struct RegistryToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl RegistryToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolExecutor for RegistryToolExecutor {
    fn resolve(&self, name: &str) -> Result<ToolName, ToolError> {
        self.registry.resolve(name).map(|tool| tool.name())
    }

    async fn execute(&self, name: ToolName, input: Value, ctx: ToolContext) -> ToolOutcome {
        let conv_id = ctx.conversation_id.clone();
        match self.registry.invoke(name.as_str(), input, ctx).await {
            Ok(output) => ToolOutcome::Output(output),
            Err(e) => {
                tracing::info!(conv_id = %conv_id, tool = %name, error = %e, "Tool call failed");
                ToolOutcome::Error(e.to_string())
            }
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}
