//! Tool gateway doubles for fault injection.

use async_trait::async_trait;
use concierge_core::{ToolCall, ToolDescriptor, ToolError, ToolResult};
use concierge_gateway::ToolGateway;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A gateway nobody can reach
#[derive(Debug, Clone, Default)]
pub struct UnreachableGateway {
    calls: Arc<AtomicUsize>,
}

impl UnreachableGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolGateway for UnreachableGateway {
    async fn call(&self, _call: ToolCall) -> ToolResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ToolError::unreachable("connection refused"))
    }

    async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
        Err(ToolError::unreachable("connection refused"))
    }
}

/// Fails the first `failures` calls as unreachable, then delegates
pub struct FlakyGateway {
    inner: Arc<dyn ToolGateway>,
    failures: usize,
    calls: AtomicUsize,
}

impl std::fmt::Debug for FlakyGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyGateway")
            .field("failures", &self.failures)
            .field("calls", &self.calls)
            .finish()
    }
}

impl FlakyGateway {
    pub fn new(inner: Arc<dyn ToolGateway>, failures: usize) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolGateway for FlakyGateway {
    async fn call(&self, call: ToolCall) -> ToolResult<Value> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(ToolError::unreachable(format!(
                "injected failure {} of {}",
                attempt + 1,
                self.failures
            )));
        }
        self.inner.call(call).await
    }

    async fn tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
        self.inner.tools().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_gateway::{LocalGateway, Store};

    #[tokio::test]
    async fn test_unreachable_counts_calls() {
        let gateway = UnreachableGateway::new();
        let err = gateway
            .call(ToolCall::FetchRecord { customer_id: 1 })
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_flaky_recovers() {
        let store = Store::open_in_memory().unwrap();
        store.seed().unwrap();
        let gateway = FlakyGateway::new(Arc::new(LocalGateway::new(Arc::new(store))), 1);

        assert!(gateway.call(ToolCall::FetchRecord { customer_id: 1 }).await.is_err());
        let record = gateway
            .call(ToolCall::FetchRecord { customer_id: 1 })
            .await
            .unwrap();
        assert_eq!(record["id"], 1);
        assert_eq!(gateway.call_count(), 2);
    }
}
