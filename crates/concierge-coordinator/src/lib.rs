//! # Concierge Coordinator
//!
//! Turns one customer-service request into calls on specialist agents and
//! folds their results into one answer:
//!
//! 1. **Classify** the text into intents ([`Classifier`], [`RuleClassifier`])
//! 2. **Plan** by resolving each intent's capability in the [`AgentDirectory`]
//!    ([`DispatchPlan`])
//! 3. **Dispatch** independent steps concurrently and dependent steps in order
//!    ([`Executor`])
//! 4. **Synthesize** an [`AggregatedResponse`](concierge_core::AggregatedResponse)
//!    that reports every failed step
//!
//! Only classification and routing errors abort a request; anything that goes
//! wrong inside a specialist call is reported as a step result.
//!
//! ```rust,ignore
//! use concierge_agent::HttpTransport;
//! use concierge_coordinator::{AgentDirectory, Coordinator, CoordinatorConfig, RuleClassifier};
//! use concierge_core::Request;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HttpTransport::new()?);
//! let directory = Arc::new(AgentDirectory::new(transport.clone()));
//! directory.discover("http://127.0.0.1:9300").await?;
//! directory.discover("http://127.0.0.1:9301").await?;
//!
//! let coordinator = Coordinator::new(
//!     Arc::new(RuleClassifier::new()),
//!     directory,
//!     transport,
//!     CoordinatorConfig::default(),
//! );
//! let response = coordinator
//!     .handle(&Request::new("What is the status of customer 1?", "session-1"))
//!     .await?;
//! println!("{}", response.narrative);
//! ```

pub mod classifier;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod executor;
pub mod plan;
pub mod server;
pub mod synthesis;

pub use classifier::{Classifier, RuleClassifier};
pub use client::CoordinatorClient;
pub use config::{CoordinatorConfig, DEFAULT_COORDINATOR_ADDR};
pub use coordinator::{COORDINATOR_ID, Coordinator};
pub use directory::{AgentDirectory, DirectoryEntry, DirectoryEvent};
pub use error::{CoordinatorError, CoordinatorResult, DirectoryError};
pub use executor::{CancelHandle, CancelSignal, ExecutionReport, Executor};
pub use plan::{DispatchPlan, PlanStep};
pub use server::{AskRequest, CoordinatorServer};
pub use synthesis::synthesize;
