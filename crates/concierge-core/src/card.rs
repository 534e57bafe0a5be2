//! Agent cards: the capability discovery document every agent publishes at
//! `/.well-known/agent.json`.

use crate::capability::{Capability, CapabilityMatch};
use serde::{Deserialize, Serialize};

/// Well-known path of the agent card
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// Capability discovery document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Unique identifier for the agent
    pub agent_id: String,

    /// Human-readable name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base URL the agent is reachable at
    pub url: String,

    /// Capabilities the agent serves, used for routing
    #[serde(default)]
    pub capabilities: Vec<Capability>,

    /// Skills, for human consumption
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<AgentSkill>,

    pub version: String,
}

impl AgentCard {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            description: None,
            url: url.into(),
            capabilities: Vec::new(),
            skills: Vec::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<Capability>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    #[must_use]
    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Best match among the declared capabilities for `requested`
    pub fn best_match(&self, requested: &Capability) -> Option<CapabilityMatch> {
        self.capabilities
            .iter()
            .filter_map(|declared| declared.matches(requested))
            .max()
    }
}

/// A skill advertised on an agent card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AgentSkill {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
