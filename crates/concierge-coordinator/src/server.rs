//! HTTP front door for the coordinator.
//!
//! - `POST /requests` takes `{"text": "...", "session_id": "..."}` and returns
//!   the aggregated response
//! - `GET /directory` lists registered specialists
//! - `GET /health`
//! - `GET /.well-known/agent.json` serves the coordinator's own card

use crate::coordinator::Coordinator;
use crate::directory::DirectoryEntry;
use crate::error::{CoordinatorError, CoordinatorResult};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use concierge_core::{AGENT_CARD_PATH, AgentCard, AggregatedResponse, ErrorResponse, Request};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Body of `POST /requests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub text: String,
    /// Generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn into_request(self) -> Request {
        let session_id = self
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Request::new(self.text, session_id)
    }
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::from(&self);
        if status.is_server_error() {
            tracing::error!(error_code = %body.code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code = %body.code, error = %self, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    coordinator: Arc<Coordinator>,
    public_url: String,
}

pub struct CoordinatorServer {
    coordinator: Arc<Coordinator>,
    public_url: Option<String>,
}

impl CoordinatorServer {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            public_url: None,
        }
    }

    /// URL advertised on the coordinator's card
    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let public_url = self
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.coordinator.config().bind_addr));

        Router::new()
            .route("/requests", post(handle_request))
            .route("/directory", get(list_directory))
            .route("/health", get(health))
            .route(AGENT_CARD_PATH, get(get_agent_card))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(AppState {
                coordinator: Arc::clone(&self.coordinator),
                public_url,
            })
    }

    pub async fn serve(self, addr: &str) -> CoordinatorResult<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> CoordinatorResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr()?;
        let specialists = self.coordinator.directory().len().await;
        info!(
            address = %address,
            specialists,
            "Coordinator server starting"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

async fn handle_request(
    State(state): State<AppState>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AggregatedResponse>, CoordinatorError> {
    let request = body.into_request();
    let response = state.coordinator.handle(&request).await?;
    Ok(Json(response))
}

async fn list_directory(State(state): State<AppState>) -> Json<Vec<DirectoryEntry>> {
    Json(state.coordinator.directory().list().await)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "specialists": state.coordinator.directory().len().await,
    }))
}

async fn get_agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.coordinator.card(state.public_url))
}
