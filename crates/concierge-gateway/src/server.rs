//! HTTP surface of the tool gateway.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | GET | `/tools` | tool discovery document |
//! | POST | `/call` | `{"tool": name, "params": {...}}` → `ToolResponse` |
//! | GET | `/health` | liveness |
//!
//! Tool-level outcomes always come back as a `ToolResponse` body; the HTTP status
//! mirrors the tool status so generic HTTP tooling sees failures too.

use crate::catalog;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::ToolGateway;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use concierge_core::{ToolCall, ToolError, ToolResponse, ToolResult, ToolStatus};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    gateway: Arc<dyn ToolGateway>,
}

/// HTTP server exposing a [`ToolGateway`]
pub struct GatewayServer {
    gateway: Arc<dyn ToolGateway>,
}

impl GatewayServer {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self { gateway }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            gateway: Arc::clone(&self.gateway),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/tools", get(list_tools))
            .route("/call", post(call_tool))
            .route("/health", get(health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind `addr` and serve until the process exits
    pub async fn serve(self, addr: &str) -> GatewayResult<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve on an already bound listener until `signal` resolves
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr()?;
        info!(address = %address, tools = ToolCall::NAMES.len(), "Tool gateway starting");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(GatewayError::Server)
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn list_tools(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.gateway.tools().await {
        Ok(tools) => (StatusCode::OK, Json(json!(tools))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!(concierge_core::ErrorResponse::from(&err))),
        ),
    }
}

async fn call_tool(
    State(state): State<AppState>,
    Json(mut body): Json<Value>,
) -> (StatusCode, Json<ToolResponse>) {
    let tool = body
        .get("tool")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if !catalog::is_known(&tool) {
        warn!(tool = %tool, "Rejected unknown tool");
        return respond(Err(ToolError::unknown_tool(tool)));
    }

    // parameterless calls may omit `params`
    if let Some(object) = body.as_object_mut() {
        object.entry("params").or_insert_with(|| json!({}));
    }

    let call: ToolCall = match serde_json::from_value(body) {
        Ok(call) => call,
        Err(e) => {
            return respond(Err(ToolError::validation(format!(
                "invalid parameters for {tool}: {e}"
            ))));
        }
    };

    respond(state.gateway.call(call).await)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "tools": ToolCall::NAMES.len() }))
}

fn respond(result: ToolResult<Value>) -> (StatusCode, Json<ToolResponse>) {
    let response = ToolResponse::from(result);
    (http_status(response.status), Json(response))
}

fn http_status(status: ToolStatus) -> StatusCode {
    match status {
        ToolStatus::Ok => StatusCode::OK,
        ToolStatus::NotFound => StatusCode::NOT_FOUND,
        ToolStatus::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ToolStatus::UnknownTool => StatusCode::BAD_REQUEST,
        ToolStatus::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(http_status(ToolStatus::Ok), StatusCode::OK);
        assert_eq!(http_status(ToolStatus::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            http_status(ToolStatus::ValidationError),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_respond_carries_error_detail() {
        let (status, Json(body)) = respond(Err(ToolError::not_found("customer 8")));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.status, ToolStatus::NotFound);
        assert_eq!(body.error.as_deref(), Some("customer 8 not found"));
    }
}
