//! # Concierge Tool Gateway
//!
//! The only component that touches persisted state. It exposes a fixed catalog of
//! five atomic operations over customers and tickets:
//!
//! | Tool | Read-only | Result |
//! |------|-----------|--------|
//! | `fetch_record` | yes | customer or not-found |
//! | `list_records` | yes | customers ordered by id |
//! | `update_record` | no | updated customer, not-found or validation error |
//! | `create_ticket` | no | new ticket or not-found (customer) |
//! | `fetch_history` | yes | tickets, oldest first |
//!
//! Specialists reach the catalog through the [`ToolGateway`] trait, either
//! in-process ([`LocalGateway`]) or over HTTP ([`GatewayClient`] talking to a
//! [`GatewayServer`]).
//!
//! ```rust,ignore
//! use concierge_gateway::{GatewayServer, LocalGateway, Store};
//! use std::sync::Arc;
//!
//! let store = Store::open("concierge.db")?;
//! store.seed()?;
//! let gateway = Arc::new(LocalGateway::new(Arc::new(store)));
//! GatewayServer::new(gateway).serve("127.0.0.1:8000").await?;
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod server;
pub mod store;

pub use client::GatewayClient;
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{LocalGateway, ToolGateway};
pub use server::GatewayServer;
pub use store::{SeedReport, Store};
