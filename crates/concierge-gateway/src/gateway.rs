//! The `ToolGateway` seam: how specialists reach the store.

use crate::catalog;
use crate::store::Store;
use async_trait::async_trait;
use concierge_core::{ToolCall, ToolDescriptor, ToolError, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Request/response access to the tool catalog
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Execute one tool call
    async fn call(&self, call: ToolCall) -> ToolResult<Value>;

    /// Catalog of available tools
    async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>>;
}

#[async_trait]
impl<T: ToolGateway + ?Sized> ToolGateway for Arc<T> {
    async fn call(&self, call: ToolCall) -> ToolResult<Value> {
        (**self).call(call).await
    }

    async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
        (**self).tools().await
    }
}

/// In-process gateway running calls directly against a [`Store`]
#[derive(Debug, Clone)]
pub struct LocalGateway {
    store: Arc<Store>,
}

impl LocalGateway {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

#[async_trait]
impl ToolGateway for LocalGateway {
    async fn call(&self, call: ToolCall) -> ToolResult<Value> {
        let store = Arc::clone(&self.store);
        let tool = call.name();
        debug!(tool, "Executing tool call");
        tokio::task::spawn_blocking(move || catalog::execute(&store, &call))
            .await
            .map_err(|e| ToolError::internal(format!("tool task failed: {e}")))?
            .map_err(ToolError::from)
    }

    async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
        Ok(catalog::descriptors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::CustomerUpdate;

    fn gateway() -> LocalGateway {
        let store = Store::open_in_memory().unwrap();
        store.seed().unwrap();
        LocalGateway::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_local_call() {
        let gateway = gateway();
        let value = gateway
            .call(ToolCall::FetchRecord { customer_id: 12345 })
            .await
            .unwrap();
        assert_eq!(value["email"], "priya@example.com");
    }

    #[tokio::test]
    async fn test_local_errors_keep_their_kind() {
        let gateway = gateway();
        let err = gateway
            .call(ToolCall::UpdateRecord {
                customer_id: 1,
                changes: CustomerUpdate::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_arc_dyn_gateway() {
        let gateway: Arc<dyn ToolGateway> = Arc::new(gateway());
        assert_eq!(gateway.tools().await.unwrap().len(), 5);
    }
}
