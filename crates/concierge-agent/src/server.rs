//! HTTP hosting for a specialist.
//!
//! ```rust,ignore
//! let specialist = DataSpecialist::new(gateway).with_url("http://127.0.0.1:9300");
//! SpecialistServer::new(specialist).serve("127.0.0.1:9300").await?;
//! ```

use crate::error::AgentResult;
use crate::specialist::Specialist;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use concierge_core::{AGENT_CARD_PATH, AgentCard, SpecialistResult, TaskRequest};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Serves one specialist at `/tasks/send` with its card at the well-known path
pub struct SpecialistServer<S: Specialist + ?Sized> {
    specialist: Arc<S>,
}

impl<S: Specialist> SpecialistServer<S> {
    pub fn new(specialist: S) -> Self {
        Self {
            specialist: Arc::new(specialist),
        }
    }
}

impl<S: Specialist + ?Sized> SpecialistServer<S> {
    pub fn from_arc(specialist: Arc<S>) -> Self {
        Self { specialist }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route(AGENT_CARD_PATH, get(get_agent_card::<S>))
            .route("/tasks/send", post(send_task::<S>))
            .route("/health", get(health::<S>))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.specialist))
    }

    pub async fn serve(self, addr: &str) -> AgentResult<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> AgentResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let card = self.specialist.card();
        let address = listener.local_addr()?;
        info!(
            agent_id = %card.agent_id,
            name = %card.name,
            address = %address,
            capabilities = ?card.capabilities,
            "Specialist server starting"
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

async fn get_agent_card<S: Specialist + ?Sized>(
    State(specialist): State<Arc<S>>,
) -> Json<AgentCard> {
    Json(specialist.card())
}

async fn send_task<S: Specialist + ?Sized>(
    State(specialist): State<Arc<S>>,
    Json(task): Json<TaskRequest>,
) -> Json<SpecialistResult> {
    debug!(task_id = %task.task_id, intent = %task.intent.kind, "Received task");
    Json(specialist.perform(task).await)
}

async fn health<S: Specialist + ?Sized>(State(specialist): State<Arc<S>>) -> Json<Value> {
    Json(json!({ "status": "ok", "agent": specialist.card().agent_id }))
}
