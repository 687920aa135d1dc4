//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{CancelResponse, ChatRequest, ErrorResponse, ToolsResponse};
use super::AppState;
use crate::runtime::{RuntimeError, TurnSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat submission, answered with an SSE stream
        .route("/api/chat", post(chat))
        // Live view of an in-flight response
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/cancel", post(cancel_conversation))
        .route("/api/tools", get(list_tools))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    if req.conversation_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "conversationId must not be empty".to_string(),
        ));
    }

    tracing::info!(
        conv_id = %req.conversation_id,
        history = req.messages.len(),
        "Chat request"
    );

    let turn = state
        .sessions
        .start_turn(&req.conversation_id, req.messages, &req.message)
        .await?;

    Ok(sse_stream(turn).into_response())
}

// ============================================================
// Conversation Control
// ============================================================

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnSnapshot>, AppError> {
    Ok(Json(state.sessions.snapshot(&id).await?))
}

async fn cancel_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    state.sessions.cancel(&id).await?;
    Ok(Json(CancelResponse { ok: true }))
}

// ============================================================
// Tools
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.sessions.tool_definitions(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("stargazer ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::AgentBusy(_) => AppError::Conflict(err.to_string()),
            RuntimeError::NotFound(_) => AppError::NotFound(err.to_string()),
            RuntimeError::EmptyMessage | RuntimeError::InvalidHistory(_) => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurnConfig;
    use crate::planner::{KeywordPlanner, Step};
    use crate::runtime::testing::{DelayedToolExecutor, ScriptedPlanner};
    use crate::runtime::{RegistryToolExecutor, SessionManager, ToolExecutor};
    use crate::tools::ToolRegistry;
    use crate::transcript::{TranscriptBuilder, TranscriptEvent};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(planner: Arc<dyn crate::planner::Planner>, tools: Arc<dyn ToolExecutor>) -> (Router, Arc<SessionManager>) {
        let sessions = Arc::new(SessionManager::new(planner, tools, TurnConfig::default()));
        (create_router(AppState::new(sessions.clone())), sessions)
    }

    fn app() -> Router {
        let tools = Arc::new(RegistryToolExecutor::new(Arc::new(ToolRegistry::standard().unwrap())));
        app_with(Arc::new(KeywordPlanner::new().unwrap()), tools).0
    }

    fn chat_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Decode the `data:` lines of an SSE body
    fn parse_sse(body: &str) -> Vec<TranscriptEvent> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_chat_streams_weather_answer() {
        let response = app()
            .oneshot(chat_request(&json!({
                "conversationId": "c1",
                "messages": [],
                "message": "What's the weather in Titan?"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        let body = body_string(response).await;
        assert!(body.contains("event: message-start"));
        assert!(body.contains("event: part-appended"));

        let events = parse_sse(&body);
        assert!(matches!(events.last(), Some(TranscriptEvent::Finish { .. })));
        let message = TranscriptBuilder::replay(&events).unwrap();
        let tool = message.parts[0].as_tool().unwrap();
        assert_eq!(tool.output.as_ref().unwrap()["location"], "Titan");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let response = app()
            .oneshot(chat_request(&json!({
                "conversationId": "c1",
                "message": "  "
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "Message text must not be empty");
    }

    #[tokio::test]
    async fn test_chat_conflict_while_busy() {
        let tools = Arc::new(DelayedToolExecutor::new(Duration::from_secs(30)));
        let planner = Arc::new(ScriptedPlanner::new([Step::CallTool {
            name: "weather".to_string(),
            args: json!({"location": "Titan"}),
        }]));
        let (app, _sessions) = app_with(planner, tools.clone());

        let first = app
            .clone()
            .oneshot(chat_request(&json!({"conversationId": "c1", "message": "weather"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        tools.started.notified().await;

        let second = app
            .clone()
            .oneshot(chat_request(&json!({"conversationId": "c1", "message": "again"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let snapshot = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/conversations/c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(snapshot.status(), StatusCode::OK);
        let snapshot: Value = serde_json::from_str(&body_string(snapshot).await).unwrap();
        assert_eq!(snapshot["status"], "reasoning");
        assert_eq!(snapshot["message"]["parts"][0]["state"], "input-available");

        let cancel = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/conversations/c1/cancel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(cancel.status(), StatusCode::OK);

        let events = parse_sse(&body_string(first).await);
        assert!(matches!(
            events.last(),
            Some(TranscriptEvent::Finish { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/conversations/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_tools() {
        let response = app()
            .oneshot(Request::builder().uri("/api/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        let names: Vec<_> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            ["weather", "hazardScan", "navigationWindows", "celestialEvents", "whatToWear"]
        );
    }

    #[tokio::test]
    async fn test_version() {
        let response = app()
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_string(response).await.starts_with("stargazer "));
    }
}
