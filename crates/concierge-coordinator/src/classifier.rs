//! Request classification.
//!
//! The [`Classifier`] trait is the seam between the coordinator and whatever
//! understands natural language. [`RuleClassifier`] is the deterministic,
//! keyword-and-regex implementation used by the CLI and the demo.
//!
//! ```rust,ignore
//! let intents = RuleClassifier::new()
//!     .classify("Update customer ID 5 email to new@example.com and show my ticket history")
//!     .await?;
//! assert_eq!(intents.len(), 2);
//! assert_eq!(intents[1].depends_on, Some(0));
//! ```

use crate::error::{CoordinatorError, CoordinatorResult};
use async_trait::async_trait;
use concierge_core::{
    CustomerStatus, CustomerUpdate, Intent, IntentKind, IntentParams, Priority, TicketStatus,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Turns request text into an ordered list of intents.
///
/// An empty list means no intent was found; the coordinator rejects the
/// request as unclassified.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> CoordinatorResult<Vec<Intent>>;
}

// ============================================================================
// Rules
// ============================================================================

/// Phrases that escalate a support request to high priority
const URGENT_PHRASES: &[&str] = &[
    "refund",
    "charged twice",
    "double charge",
    "duplicate charge",
    "urgent",
    "immediately",
    "asap",
    "outage",
    "compromised",
    "fraud",
];

/// Phrases that turn a request into a support ticket
const SUPPORT_PHRASES: &[&str] = &[
    "help with",
    "need help",
    "help me",
    "assistance",
    "issue with",
    "problem with",
    "not working",
    "can't",
    "cannot",
    "unable to",
];

const MAX_ISSUE_LEN: usize = 500;

struct Rules {
    customer_id: Regex,
    bare_id: Regex,
    email: Regex,
    phone: Regex,
    name: Regex,
    update_verb: Regex,
    activate: Regex,
    deactivate: Regex,
    list: Regex,
    limit: Regex,
    open_tickets: Regex,
    create_ticket: Regex,
    history: Regex,
    lookup: Regex,
}

impl Rules {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            customer_id: Regex::new(
                r"(?i)\b(?:customer|client|account)\s*(?:id|number|no\.?)?\s*[:#]?\s*(\d+)",
            )?,
            bare_id: Regex::new(r"(?i)(?:\bid\s*[:#]?\s*|#)(\d+)")?,
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
            phone: Regex::new(
                r"(?i)\bphone(?:\s+number)?\s+(?:to|=|:)\s*(\+?[0-9][0-9 ().-]{5,}[0-9])",
            )?,
            name: Regex::new(r"(?i)\bname\s+to\s+([A-Za-z][A-Za-z .'-]*?)(?:\s+and\b|[,.!?]|$)")?,
            update_verb: Regex::new(r"(?i)\b(?:update|change|set|modify|correct)\b")?,
            activate: Regex::new(r"(?i)\b(?:upgrade|upgrading|(?:re)?activate|enable)\b")?,
            deactivate: Regex::new(r"(?i)\b(?:disable|deactivate|suspend)\b")?,
            list: Regex::new(r"(?i)\b(?:list|all|every)\b.*\bcustomers\b")?,
            limit: Regex::new(r"(?i)\b(?:top|first)\s+(\d+)\b")?,
            open_tickets: Regex::new(
                r"(?i)\b(?:with|have|having|has|holding)\s+(?:an?\s+|any\s+)?open\s+tickets?\b",
            )?,
            create_ticket: Regex::new(
                r"(?i)\b(?:create|open|file|raise|submit|log)\s+(?:a\s+|an\s+)?(?:new\s+)?(?:support\s+)?ticket\b",
            )?,
            history: Regex::new(r"(?i)\b(?:history|tickets)\b")?,
            lookup: Regex::new(
                r"(?i)\b(?:status\s+of|info|information|details|look\s*up|profile|who\s+is)\b",
            )?,
        })
    }

    fn customer_id(&self, text: &str) -> Option<i64> {
        self.customer_id
            .captures(text)
            .or_else(|| self.bare_id.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn changes(&self, text: &str, support: bool) -> CustomerUpdate {
        let mut changes = CustomerUpdate::default();
        if self.update_verb.is_match(text) {
            if let Some(email) = self.email.find(text) {
                changes = changes.with_email(email.as_str());
            }
            if let Some(phone) = self.phone.captures(text).and_then(|c| c.get(1)) {
                changes = changes.with_phone(phone.as_str().trim());
            }
            if let Some(name) = self.name.captures(text).and_then(|c| c.get(1)) {
                changes = changes.with_name(name.as_str().trim());
            }
        }
        // Asking for help with an upgrade is a ticket, not a state change
        if !support {
            if self.deactivate.is_match(text) {
                changes = changes.with_status(CustomerStatus::Disabled);
            } else if self.activate.is_match(text) {
                changes = changes.with_status(CustomerStatus::Active);
            }
        }
        changes
    }
}

static RULES: Lazy<Result<Rules, regex::Error>> = Lazy::new(Rules::compile);

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}

fn issue_text(text: &str) -> String {
    text.trim().chars().take(MAX_ISSUE_LEN).collect()
}

// ============================================================================
// RuleClassifier
// ============================================================================

/// Deterministic keyword and pattern classifier.
///
/// Mutating intents come first. Read-only intents about the same customer
/// depend on the last mutating intent so they observe every change; listings
/// are always independent. A support request also fetches the customer
/// record alongside the ticket, and a listing qualified by open tickets is
/// narrowed by a dependent ticket history step.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn classify_with(rules: &Rules, text: &str) -> Vec<Intent> {
        let lower = text.to_lowercase();
        let customer_id = rules.customer_id(text);

        let urgent = contains_any(&lower, URGENT_PHRASES);
        let support = urgent
            || contains_any(&lower, SUPPORT_PHRASES)
            || rules.create_ticket.is_match(text);

        let mut intents = Vec::new();

        let changes = rules.changes(text, support);
        if !changes.is_empty() {
            intents.push(Intent::new(
                IntentKind::Update,
                IntentParams {
                    customer_id,
                    changes: Some(changes),
                    ..Default::default()
                },
            ));
        }
        let update = (!intents.is_empty()).then_some(0);

        if support {
            intents.push(Intent::new(
                IntentKind::CreateTicket,
                IntentParams {
                    customer_id,
                    issue: Some(issue_text(text)),
                    priority: urgent.then_some(Priority::High),
                    ..Default::default()
                },
            ));
        }

        let last_mutation = intents.len().checked_sub(1);
        let after = |intent: Intent, step: Option<usize>| match step {
            Some(step) => intent.with_depends_on(step),
            None => intent,
        };

        if let Some(id) = customer_id {
            let wants_history = rules.history.is_match(text) && !rules.create_ticket.is_match(text);
            if wants_history {
                intents.push(after(Intent::history(id), last_mutation));
            }
            if rules.lookup.is_match(text) {
                intents.push(after(Intent::lookup(id), last_mutation));
            } else if support {
                // Record fetch runs beside the ticket, not behind it
                intents.push(after(Intent::lookup(id), update));
            }
        }

        if customer_id.is_none() && rules.list.is_match(text) {
            let status = if lower.contains("disabled") || lower.contains("inactive") {
                Some(CustomerStatus::Disabled)
            } else if lower.contains("active") {
                Some(CustomerStatus::Active)
            } else {
                None
            };
            let limit = rules
                .limit
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok());
            intents.push(Intent::list(status, limit));
            if rules.open_tickets.is_match(text) {
                let listing = intents.len() - 1;
                intents.push(
                    Intent::customers_with_tickets(TicketStatus::Open).with_depends_on(listing),
                );
            }
        }

        // A bare customer reference is a lookup
        if intents.is_empty() {
            if let Some(id) = customer_id {
                intents.push(Intent::lookup(id));
            }
        }

        intents
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, text: &str) -> CoordinatorResult<Vec<Intent>> {
        let rules = RULES
            .as_ref()
            .map_err(|e| CoordinatorError::classifier(e.to_string()))?;
        let intents = Self::classify_with(rules, text);
        debug!(
            intents = ?intents.iter().map(|i| i.kind).collect::<Vec<IntentKind>>(),
            "Classified request"
        );
        Ok(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn classify(text: &str) -> Vec<Intent> {
        RuleClassifier::new().classify(text).await.unwrap()
    }

    #[rstest]
    #[case("Get customer information for ID 1", 1)]
    #[case("What is the status of customer 1?", 1)]
    #[case("customer #12345", 12345)]
    #[tokio::test]
    async fn test_single_lookup(#[case] text: &str, #[case] id: i64) {
        let intents = classify(text).await;
        assert_eq!(intents, vec![Intent::lookup(id)]);
    }

    #[tokio::test]
    async fn test_list_active_customers() {
        let intents = classify("Show me all active customers").await;
        assert_eq!(intents, vec![Intent::list(Some(CustomerStatus::Active), None)]);
    }

    #[tokio::test]
    async fn test_open_tickets_qualifier_narrows_listing() {
        let intents = classify("Show me all active customers who have open tickets").await;
        assert_eq!(
            intents,
            vec![
                Intent::list(Some(CustomerStatus::Active), None),
                Intent::customers_with_tickets(TicketStatus::Open).with_depends_on(0),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_with_limit_and_disabled_filter() {
        let intents = classify("List the first 2 disabled customers").await;
        assert_eq!(
            intents,
            vec![Intent::list(Some(CustomerStatus::Disabled), Some(2))]
        );
    }

    #[tokio::test]
    async fn test_refund_is_high_priority_ticket() {
        let text = "I've been charged twice, please refund immediately! Customer ID 1";
        let intents = classify(text).await;
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].kind, IntentKind::CreateTicket);
        assert_eq!(intents[0].params.customer_id, Some(1));
        assert_eq!(intents[0].params.priority, Some(Priority::High));
        assert_eq!(intents[0].params.issue.as_deref(), Some(text));
        assert_eq!(intents[1], Intent::lookup(1));
    }

    #[tokio::test]
    async fn test_help_with_upgrade_opens_ticket() {
        let intents = classify("I'm customer ID 2 and need help upgrading my account").await;
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].kind, IntentKind::CreateTicket);
        assert_eq!(intents[0].params.customer_id, Some(2));
        assert_eq!(intents[0].params.priority, None);
        // independent record fetch fans out beside the ticket
        assert_eq!(intents[1], Intent::lookup(2));
    }

    #[tokio::test]
    async fn test_support_lookup_follows_update_only() {
        let intents =
            classify("Change the email to ops@example.com for customer 4, the login is not working")
                .await;
        assert_eq!(intents.len(), 3);
        assert_eq!(intents[0].kind, IntentKind::Update);
        assert_eq!(intents[1].kind, IntentKind::CreateTicket);
        assert_eq!(intents[2], Intent::lookup(4).with_depends_on(0));
    }

    #[tokio::test]
    async fn test_history_follows_last_mutation() {
        let intents = classify(
            "Update customer 5 email to eve@example.com, I need help with billing, and show my history",
        )
        .await;
        let kinds: Vec<IntentKind> = intents.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IntentKind::Update,
                IntentKind::CreateTicket,
                IntentKind::History,
                IntentKind::Lookup
            ]
        );
        assert_eq!(intents[0].depends_on, None);
        assert_eq!(intents[1].depends_on, None);
        assert_eq!(intents[2].depends_on, Some(1));
        assert_eq!(intents[3].depends_on, Some(0));
    }

    #[tokio::test]
    async fn test_update_then_history_pipeline() {
        let intents = classify(
            "Update customer ID 5 email to newemail@example.com and show my ticket history",
        )
        .await;
        assert_eq!(
            intents,
            vec![
                Intent::update(5, CustomerUpdate::default().with_email("newemail@example.com")),
                Intent::history(5).with_depends_on(0),
            ]
        );
    }

    #[tokio::test]
    async fn test_upgrade_then_tickets_pipeline() {
        let intents = classify("Upgrade customer 2 and show their tickets").await;
        assert_eq!(
            intents,
            vec![
                Intent::update(2, CustomerUpdate::default().with_status(CustomerStatus::Active)),
                Intent::history(2).with_depends_on(0),
            ]
        );
    }

    #[tokio::test]
    async fn test_deactivate_wins_over_activate_substring() {
        let intents = classify("Please deactivate customer 3").await;
        assert_eq!(
            intents,
            vec![Intent::update(
                3,
                CustomerUpdate::default().with_status(CustomerStatus::Disabled)
            )]
        );
    }

    #[tokio::test]
    async fn test_phone_change() {
        let intents = classify("Change the phone number to +1-555-0100 for customer 4").await;
        assert_eq!(intents.len(), 1);
        let changes = intents[0].params.changes.clone().unwrap();
        assert_eq!(changes.phone.as_deref(), Some("+1-555-0100"));
    }

    #[tokio::test]
    async fn test_update_without_customer_keeps_id_missing() {
        let intents = classify("Update my email to someone@example.com").await;
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].kind, IntentKind::Update);
        assert_eq!(intents[0].params.customer_id, None);
    }

    #[tokio::test]
    async fn test_create_ticket_phrase_is_not_history() {
        let intents = classify("Please open a ticket for customer 3, my login is broken").await;
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].kind, IntentKind::CreateTicket);
        assert!(intents.iter().all(|i| i.kind != IntentKind::History));
    }

    #[rstest]
    #[case("hello there")]
    #[case("")]
    #[case("what's the weather like?")]
    #[tokio::test]
    async fn test_no_intent(#[case] text: &str) {
        assert!(classify(text).await.is_empty());
    }
}
