//! API request and response types

use crate::tools::ToolDefinition;
use crate::transcript::Message;
use serde::{Deserialize, Serialize};

/// Request to answer a user message
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub conversation_id: String,
    /// Prior transcript, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Text of the new user message
    pub message: String,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Response listing the registered tools
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
