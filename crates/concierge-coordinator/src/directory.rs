//! Agent Directory
//!
//! Process-wide registry mapping a specialist id to the address it is reached
//! at and the capabilities it declares. Populated at startup (usually by
//! fetching each specialist's agent card) and consulted on every dispatch.
//!
//! Reads take a shared lock, so resolution stays safe while registrations
//! happen concurrently. Registration changes are published on a broadcast
//! channel for anyone who wants to follow them.

use crate::error::{CoordinatorError, CoordinatorResult, DirectoryError};
use chrono::{DateTime, Utc};
use concierge_agent::AgentTransport;
use concierge_core::{AgentCard, Capability, CapabilityMatch, IntentKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// One registered specialist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub agent_id: String,
    pub address: String,
    pub capabilities: Vec<Capability>,
    /// Card the entry was built from, when registered by discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<AgentCard>,
    pub registered_at: DateTime<Utc>,
}

impl DirectoryEntry {
    /// Best match among the declared capabilities
    pub fn best_match(&self, requested: &Capability) -> Option<CapabilityMatch> {
        self.capabilities
            .iter()
            .filter_map(|declared| declared.matches(requested))
            .max()
    }
}

/// Registry change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    AgentRegistered {
        agent_id: String,
        address: String,
        /// An entry with the same id was replaced
        replaced: bool,
    },
    AgentDeregistered {
        agent_id: String,
    },
}

pub struct AgentDirectory {
    entries: RwLock<HashMap<String, DirectoryEntry>>,
    transport: Arc<dyn AgentTransport>,
    event_tx: broadcast::Sender<DirectoryEvent>,
}

impl std::fmt::Debug for AgentDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDirectory").finish_non_exhaustive()
    }
}

impl AgentDirectory {
    /// Create an empty directory that discovers agents over `transport`
    pub fn new(transport: Arc<dyn AgentTransport>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            transport,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: DirectoryEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register (or replace) a specialist
    pub async fn register(
        &self,
        agent_id: impl Into<String>,
        address: impl Into<String>,
        capabilities: Vec<Capability>,
    ) -> CoordinatorResult<()> {
        self.insert(agent_id.into(), address.into(), capabilities, None)
            .await
    }

    /// Register a specialist from its agent card, reachable at `card.url`
    pub async fn register_card(&self, card: AgentCard) -> CoordinatorResult<()> {
        let address = card.url.clone();
        self.register_card_at(card, address).await
    }

    async fn register_card_at(&self, card: AgentCard, address: String) -> CoordinatorResult<()> {
        self.insert(
            card.agent_id.clone(),
            address,
            card.capabilities.clone(),
            Some(card),
        )
        .await
    }

    /// Fetch the agent card published at `address` and register it.
    ///
    /// The entry keeps `address`, the location the card was actually
    /// fetched from, even if the card advertises a different URL.
    pub async fn discover(&self, address: &str) -> CoordinatorResult<DirectoryEntry> {
        let card = self.transport.fetch_card(address).await.map_err(|source| {
            DirectoryError::Discovery {
                address: address.to_string(),
                source,
            }
        })?;
        let agent_id = card.agent_id.clone();
        self.register_card_at(card, address.to_string()).await?;
        self.get(&agent_id).await
    }

    async fn insert(
        &self,
        agent_id: String,
        address: String,
        capabilities: Vec<Capability>,
        card: Option<AgentCard>,
    ) -> CoordinatorResult<()> {
        if agent_id.trim().is_empty() {
            return Err(invalid_card("agent id is empty"));
        }
        if address.trim().is_empty() {
            return Err(invalid_card(format!("agent '{agent_id}' has no address")));
        }
        let capabilities: Vec<Capability> =
            capabilities.into_iter().filter(|c| !c.is_empty()).collect();
        if capabilities.is_empty() {
            return Err(invalid_card(format!(
                "agent '{agent_id}' declares no capabilities"
            )));
        }

        info!(
            agent_id = %agent_id,
            address = %address,
            capabilities = ?capabilities.iter().map(Capability::as_str).collect::<Vec<_>>(),
            "Registering agent in directory"
        );

        let entry = DirectoryEntry {
            agent_id: agent_id.clone(),
            address: address.clone(),
            capabilities,
            card,
            registered_at: Utc::now(),
        };
        let replaced = self
            .entries
            .write()
            .await
            .insert(agent_id.clone(), entry)
            .is_some();

        self.emit_event(DirectoryEvent::AgentRegistered {
            agent_id,
            address,
            replaced,
        });
        Ok(())
    }

    pub async fn deregister(&self, agent_id: &str) -> CoordinatorResult<DirectoryEntry> {
        let removed = self.entries.write().await.remove(agent_id);
        match removed {
            Some(entry) => {
                info!(agent_id = %agent_id, "Deregistered agent");
                self.emit_event(DirectoryEvent::AgentDeregistered {
                    agent_id: agent_id.to_string(),
                });
                Ok(entry)
            }
            None => Err(not_found(agent_id)),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get(&self, agent_id: &str) -> CoordinatorResult<DirectoryEntry> {
        self.entries
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| not_found(agent_id))
    }

    /// All entries, ordered by agent id
    pub async fn list(&self) -> Vec<DirectoryEntry> {
        let mut entries: Vec<_> = self.entries.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        entries
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Find the specialist serving `capability`.
    ///
    /// The most specific declared match wins. `Ok(None)` means nobody serves
    /// it; two agents tied for the best match is an `AmbiguousRoute` error.
    pub async fn resolve(&self, capability: &Capability) -> CoordinatorResult<Option<DirectoryEntry>> {
        let entries = self.entries.read().await;

        let mut best: Option<CapabilityMatch> = None;
        let mut candidates: Vec<&DirectoryEntry> = Vec::new();
        for entry in entries.values() {
            let Some(found) = entry.best_match(capability) else {
                continue;
            };
            match best {
                Some(current) if found < current => {}
                Some(current) if found == current => candidates.push(entry),
                _ => {
                    best = Some(found);
                    candidates.clear();
                    candidates.push(entry);
                }
            }
        }

        match candidates.as_slice() {
            [] => Ok(None),
            [entry] => {
                debug!(
                    capability = %capability.as_str(),
                    agent_id = %entry.agent_id,
                    "Resolved capability"
                );
                Ok(Some((*entry).clone()))
            }
            tied => {
                let mut ids: Vec<String> = tied.iter().map(|e| e.agent_id.clone()).collect();
                ids.sort();
                warn!(
                    capability = %capability.as_str(),
                    candidates = ?ids,
                    "Ambiguous capability route, review the agent catalog"
                );
                Err(CoordinatorError::AmbiguousRoute {
                    capability: capability.as_str().to_string(),
                    candidates: ids,
                })
            }
        }
    }

    /// Resolve the specialist for an intent tag, failing with `NoRoute`
    pub async fn route(&self, intent: IntentKind) -> CoordinatorResult<DirectoryEntry> {
        let capability = intent.capability().ok_or_else(|| {
            CoordinatorError::invalid_plan(format!("{intent} intents are not routable"))
        })?;
        self.resolve(&capability)
            .await?
            .ok_or_else(|| CoordinatorError::NoRoute {
                capability: capability.as_str().to_string(),
                intent,
            })
    }
}

fn invalid_card(reason: impl Into<String>) -> CoordinatorError {
    DirectoryError::InvalidCard {
        reason: reason.into(),
    }
    .into()
}

fn not_found(agent_id: &str) -> CoordinatorError {
    DirectoryError::AgentNotFound {
        agent_id: agent_id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_agent::{DataSpecialist, LocalTransport, TicketingSpecialist};
    use concierge_gateway::{LocalGateway, Store};

    fn caps(names: &[&str]) -> Vec<Capability> {
        names.iter().map(|n| Capability::new(n)).collect()
    }

    fn empty_directory() -> AgentDirectory {
        AgentDirectory::new(Arc::new(LocalTransport::new()))
    }

    #[tokio::test]
    async fn test_longest_match_wins() {
        let directory = empty_directory();
        directory
            .register("data", "local://data", caps(&["customer"]))
            .await
            .unwrap();
        directory
            .register("ticketing", "local://ticketing", caps(&["ticket", "customer.history"]))
            .await
            .unwrap();

        let history = directory.route(IntentKind::History).await.unwrap();
        assert_eq!(history.agent_id, "ticketing");
        let lookup = directory.route(IntentKind::Lookup).await.unwrap();
        assert_eq!(lookup.agent_id, "data");
        let ticket = directory.route(IntentKind::CreateTicket).await.unwrap();
        assert_eq!(ticket.agent_id, "ticketing");
    }

    #[tokio::test]
    async fn test_equal_specificity_is_ambiguous() {
        let directory = empty_directory();
        directory
            .register("b", "local://b", caps(&["customer"]))
            .await
            .unwrap();
        directory
            .register("a", "local://a", caps(&["customer"]))
            .await
            .unwrap();

        let err = directory.route(IntentKind::Lookup).await.unwrap_err();
        match err {
            CoordinatorError::AmbiguousRoute { candidates, .. } => {
                assert_eq!(candidates, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected ambiguous route, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unserved_capability_is_no_route() {
        let directory = empty_directory();
        directory
            .register("data", "local://data", caps(&["customer"]))
            .await
            .unwrap();
        let err = directory.route(IntentKind::CreateTicket).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NoRoute { intent: IntentKind::CreateTicket, .. }));
        assert!(
            directory
                .resolve(&Capability::new("ticket.create"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_reregister_replaces_and_emits_events() {
        let directory = empty_directory();
        let mut events = directory.subscribe();

        directory
            .register("data", "local://one", caps(&["customer"]))
            .await
            .unwrap();
        directory
            .register("data", "local://two", caps(&["customer"]))
            .await
            .unwrap();
        assert_eq!(directory.len().await, 1);
        assert_eq!(directory.get("data").await.unwrap().address, "local://two");

        directory.deregister("data").await.unwrap();
        assert!(directory.is_empty().await);

        assert_eq!(
            events.recv().await.unwrap(),
            DirectoryEvent::AgentRegistered {
                agent_id: "data".to_string(),
                address: "local://one".to_string(),
                replaced: false,
            }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            DirectoryEvent::AgentRegistered { replaced: true, .. }
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            DirectoryEvent::AgentDeregistered {
                agent_id: "data".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_registrations_rejected() {
        let directory = empty_directory();
        assert!(directory.register("", "local://x", caps(&["customer"])).await.is_err());
        assert!(directory.register("x", "local://x", caps(&[])).await.is_err());
        assert!(directory.deregister("ghost").await.is_err());
        assert!(matches!(
            directory.get("ghost").await.unwrap_err(),
            CoordinatorError::Directory(DirectoryError::AgentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_discover_over_local_transport() {
        let store = Store::open_in_memory().unwrap();
        store.seed().unwrap();
        let gateway = Arc::new(LocalGateway::new(Arc::new(store)));
        let transport = LocalTransport::new()
            .with_specialist("local://data", Arc::new(DataSpecialist::new(gateway.clone())))
            .with_specialist("local://ticketing", Arc::new(TicketingSpecialist::new(gateway)));
        let directory = AgentDirectory::new(Arc::new(transport));

        let data = directory.discover("local://data").await.unwrap();
        assert_eq!(data.address, "local://data");
        assert!(data.card.is_some());
        directory.discover("local://ticketing").await.unwrap();

        let listed: Vec<_> = directory.list().await.into_iter().map(|e| e.agent_id).collect();
        assert_eq!(listed, vec!["data-specialist", "ticketing-specialist"]);

        let err = directory.discover("local://missing").await.unwrap_err();
        assert_eq!(err.error_code(), "DISCOVERY_FAILED");
    }

    #[tokio::test]
    async fn test_concurrent_resolution_during_registration() {
        let directory = Arc::new(empty_directory());
        directory
            .register("data", "local://data", caps(&["customer"]))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let directory = Arc::clone(&directory);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    directory
                        .register(format!("extra-{i}"), "local://extra", caps(&["ticket"]))
                        .await
                        .unwrap();
                }
                directory.route(IntentKind::Lookup).await.unwrap().agent_id
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "data");
        }
    }
}
