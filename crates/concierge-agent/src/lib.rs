//! # Concierge Specialists
//!
//! Specialist agents each own one capability domain and reach the store only
//! through the tool gateway:
//!
//! - [`DataSpecialist`] declares `customer` and serves lookups, listings, updates
//!   (and history when no ticketing agent is registered).
//! - [`TicketingSpecialist`] declares `ticket` and `customer.history`.
//!
//! Specialists are hosted over HTTP by [`SpecialistServer`] and reached by the
//! coordinator through an [`AgentTransport`].
//!
//! ```rust,ignore
//! use concierge_agent::{DataSpecialist, SpecialistServer};
//! use concierge_gateway::GatewayClient;
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(GatewayClient::new("http://127.0.0.1:8000")?);
//! let specialist = DataSpecialist::new(gateway).with_url("http://127.0.0.1:9300");
//! SpecialistServer::new(specialist).serve("127.0.0.1:9300").await?;
//! ```

pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod server;
pub mod specialist;
pub mod ticketing;
pub mod transport;

pub use client::AgentClient;
pub use config::{SpecialistConfig, SpecialistKind};
pub use data::{DATA_SPECIALIST_ID, DataSpecialist};
pub use error::{AgentError, AgentResult};
pub use server::SpecialistServer;
pub use specialist::{RetryPolicy, Specialist, ToolSession, verify_gateway};
pub use ticketing::{TICKETING_SPECIALIST_ID, TicketingSpecialist};
pub use transport::{AgentTransport, HttpTransport, LocalTransport};
