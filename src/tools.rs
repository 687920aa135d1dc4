//! Tools the expedition assistant can call
//!
//! The set is closed: every tool has a [`ToolName`] variant, and the registry
//! is built once at startup and never changes afterwards.

mod celestial_events;
mod hazard_scan;
mod navigation_windows;
mod weather;
mod what_to_wear;

pub use celestial_events::CelestialEventsTool;
pub use hazard_scan::HazardScanTool;
pub use navigation_windows::NavigationWindowsTool;
pub use weather::WeatherTool;
pub use what_to_wear::WhatToWearTool;

use async_trait::async_trait;
use futures::FutureExt;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Names of the registered tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    Weather,
    HazardScan,
    NavigationWindows,
    CelestialEvents,
    WhatToWear,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Weather,
        ToolName::HazardScan,
        ToolName::NavigationWindows,
        ToolName::CelestialEvents,
        ToolName::WhatToWear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Weather => "weather",
            ToolName::HazardScan => "hazardScan",
            ToolName::NavigationWindows => "navigationWindows",
            ToolName::CelestialEvents => "celestialEvents",
            ToolName::WhatToWear => "whatToWear",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Errors raised by the registry
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    #[error("tool already registered: {0}")]
    DuplicateTool(ToolName),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {}", violations.join("; "))]
    InvalidArguments {
        tool: ToolName,
        violations: Vec<String>,
    },
    #[error("{tool} failed: {message}")]
    ToolExecution { tool: ToolName, message: String },
}

/// Tool description handed to planners and API clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: String,
    pub input_schema: Value,
}

/// Per-invocation context
#[derive(Clone)]
pub struct ToolContext {
    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// The conversation this tool is executing within
    pub conversation_id: String,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, conversation_id: impl Into<String>) -> Self {
        Self {
            cancel,
            conversation_id: conversation_id.into(),
        }
    }
}

/// Trait for tools that can be executed by the assistant
///
/// Tools are stateless singletons; per-call context comes via `ToolContext`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    /// Tool description for planners
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Check raw arguments, returning every violated constraint
    fn validate(&self, input: &Value) -> Result<(), Vec<String>>;

    /// Execute with arguments that passed `validate`
    async fn run(&self, input: Value, ctx: ToolContext) -> Result<Value, String>;
}

/// Collection of tools available to conversations
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// The five expedition tools
    pub fn standard() -> Result<Self, ToolError> {
        let mut registry = Self::empty();
        registry.register(Arc::new(WeatherTool))?;
        registry.register(Arc::new(HazardScanTool))?;
        registry.register(Arc::new(NavigationWindowsTool))?;
        registry.register(Arc::new(CelestialEventsTool))?;
        registry.register(Arc::new(WhatToWearTool))?;
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name();
        if self.tools.iter().any(|t| t.name() == name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.tools
            .iter()
            .find(|t| t.name().as_str() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn validate_input(&self, name: &str, raw_args: &Value) -> Result<(), ToolError> {
        let tool = self.resolve(name)?;
        tool.validate(raw_args)
            .map_err(|violations| ToolError::InvalidArguments {
                tool: tool.name(),
                violations,
            })
    }

    /// Validate, then execute. Failures inside the tool, panics included,
    /// come back as `ToolExecution`.
    pub async fn invoke(
        &self,
        name: &str,
        raw_args: Value,
        ctx: ToolContext,
    ) -> Result<Value, ToolError> {
        self.validate_input(name, &raw_args)?;
        let tool = self.resolve(name)?;
        let tool_name = tool.name();

        match AssertUnwindSafe(tool.run(raw_args, ctx)).catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(message)) => Err(ToolError::ToolExecution {
                tool: tool_name,
                message,
            }),
            Err(_) => {
                tracing::error!(tool = %tool_name, "Tool panicked");
                Err(ToolError::ToolExecution {
                    tool: tool_name,
                    message: "the tool crashed unexpectedly".to_string(),
                })
            }
        }
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Input shared by the location-based tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationInput {
    pub location: String,
}

fn location_schema(what: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["location"],
        "additionalProperties": false,
        "properties": {
            "location": {
                "type": "string",
                "minLength": 1,
                "description": format!("Body, moon or station to {what}")
            }
        }
    })
}

fn parse_location(input: &Value) -> Result<LocationInput, Vec<String>> {
    let args: LocationInput = parse_args(input)?;
    if args.location.trim().is_empty() {
        return Err(vec!["location must not be empty".to_string()]);
    }
    Ok(args)
}

/// Deserialize tool arguments; a shape mismatch is one violation
fn parse_args<T: DeserializeOwned>(input: &Value) -> Result<T, Vec<String>> {
    if !input.is_object() {
        return Err(vec!["arguments must be a JSON object".to_string()]);
    }
    serde_json::from_value(input.clone()).map_err(|e| vec![e.to_string()])
}

fn to_output<T: Serialize>(output: &T) -> Result<Value, String> {
    serde_json::to_value(output).map_err(|e| format!("Failed to encode output: {e}"))
}

/// Pick one entry of a non-empty content table
fn pick(table: &[&'static str], rng: &mut impl Rng) -> &'static str {
    table.choose(rng).copied().unwrap_or_default()
}
