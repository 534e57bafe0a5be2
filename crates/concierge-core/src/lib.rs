//! # Concierge Core
//!
//! Shared vocabulary for every Concierge process: the persisted entities owned by the
//! tool gateway, the intents produced by classification, the results returned by
//! specialists, the wire protocol spoken between processes and the capability cards
//! agents publish for discovery.
//!
//! Apart from reading `CONCIERGE_*` environment variables, nothing here performs I/O.

pub mod capability;
pub mod card;
pub mod config;
pub mod error;
pub mod intent;
pub mod model;
pub mod protocol;
pub mod result;

pub use capability::{Capability, CapabilityMatch};
pub use card::{AGENT_CARD_PATH, AgentCard, AgentSkill};
pub use config::ConfigError;
pub use error::{ErrorResponse, ToolError, ToolResult};
pub use intent::{Intent, IntentKind, IntentParams, Request};
pub use model::{Customer, CustomerStatus, CustomerUpdate, Priority, Ticket, TicketStatus};
pub use protocol::{TaskRequest, ToolCall, ToolDescriptor, ToolResponse, ToolStatus};
pub use result::{
    AggregateStatus, AggregatedResponse, ResultStatus, SpecialistResult, StepFailure, StepOutcome,
};
