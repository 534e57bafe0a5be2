//! End-to-end coordination through the in-process harness.

use concierge_agent::{DATA_SPECIALIST_ID, TICKETING_SPECIALIST_ID};
use concierge_coordinator::{CancelSignal, CoordinatorError, DispatchPlan};
use concierge_core::{
    AggregateStatus, CustomerStatus, CustomerUpdate, Intent, IntentKind, Priority, ResultStatus,
};
use concierge_testing::{
    FailingSpecialist, ScriptedClassifier, SlowSpecialist, StubSpecialist, TestHarness,
    UnreachableGateway, test_config,
};
use std::sync::Arc;
use std::time::Duration;

fn scripted(intents: Vec<Intent>) -> Arc<ScriptedClassifier> {
    Arc::new(ScriptedClassifier::new().with_default(intents))
}

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn test_independent_intents_all_succeed_in_order() {
    let harness = TestHarness::builder()
        .with_classifier(scripted(vec![
            Intent::lookup(1),
            Intent::history(4),
            Intent::list(Some(CustomerStatus::Active), None),
        ]))
        .build()
        .await
        .unwrap();

    let response = harness.ask("three things").await.unwrap();
    assert_eq!(response.status, AggregateStatus::Success);
    assert_eq!(response.results.len(), 3);
    let kinds: Vec<_> = response.results.iter().map(|o| o.intent).collect();
    assert_eq!(
        kinds,
        vec![IntentKind::Lookup, IntentKind::History, IntentKind::List]
    );
    assert!(response.failures.is_empty());
}

#[tokio::test]
async fn test_one_failing_step_gives_partial_naming_intent() {
    let data = StubSpecialist::new("stub-data").with_capability("customer");
    let harness = TestHarness::builder()
        .without_default_specialists()
        .with_specialist("local://stub-data", Arc::new(data.clone()))
        .with_specialist(
            "local://broken-tickets",
            Arc::new(FailingSpecialist::new("broken-tickets", "queue offline").with_capability("ticket")),
        )
        .with_classifier(scripted(vec![
            Intent::lookup(1),
            Intent::create_ticket(1, "printer jammed", None),
            Intent::lookup(2),
        ]))
        .build()
        .await
        .unwrap();

    let response = harness.ask("mixed").await.unwrap();
    assert_eq!(response.status, AggregateStatus::Partial);
    assert_eq!(response.results.len(), 3);
    assert!(response.results[0].result.is_success());
    assert!(response.results[2].result.is_success());

    assert_eq!(response.failures.len(), 1);
    let failure = &response.failures[0];
    assert_eq!(failure.step, 1);
    assert_eq!(failure.intent, IntentKind::CreateTicket);
    assert!(failure.reason.contains("create-ticket"), "{}", failure.reason);
    assert!(response.narrative.contains("(create-ticket) failed"));
    assert_eq!(data.call_count(), 2);
}

#[tokio::test]
async fn test_every_step_failing_is_failure() {
    let harness = TestHarness::builder()
        .with_classifier(scripted(vec![Intent::lookup(404), Intent::history(405)]))
        .build()
        .await
        .unwrap();

    let response = harness.ask("ghosts").await.unwrap();
    assert_eq!(response.status, AggregateStatus::Failure);
    assert_eq!(response.failures.len(), 2);
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_status_question_is_single_lookup() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness.ask("What is the status of customer 1?").await.unwrap();

    assert_eq!(response.status, AggregateStatus::Success);
    assert_eq!(response.results.len(), 1);
    let outcome = &response.results[0];
    assert_eq!(outcome.intent, IntentKind::Lookup);
    assert_eq!(outcome.specialist, "data-specialist");
    assert_eq!(outcome.result.tool_calls, vec!["fetch_record"]);
    assert_eq!(outcome.result.payload["name"], "Alice Premium");
}

#[tokio::test]
async fn test_update_then_history_observes_update() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness
        .ask("Update customer ID 5 email to newemail@example.com and show my ticket history")
        .await
        .unwrap();

    assert_eq!(response.status, AggregateStatus::Success);
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].intent, IntentKind::Update);
    assert_eq!(response.results[1].intent, IntentKind::History);
    assert_eq!(response.results[1].specialist, "ticketing-specialist");

    let history = &response.results[1].result.payload;
    assert_eq!(history["customer"]["email"], "newemail@example.com");
    assert_eq!(history["count"], 1);
}

#[tokio::test]
async fn test_upgrade_then_tickets_reflects_new_status() {
    let harness = TestHarness::new().await.unwrap();
    let before = harness.store().fetch_record(3).unwrap();
    assert_eq!(before.status, CustomerStatus::Disabled);

    let response = harness
        .ask("Upgrade customer 3 and show their tickets")
        .await
        .unwrap();

    assert_eq!(response.status, AggregateStatus::Success);
    let kinds: Vec<_> = response.results.iter().map(|o| o.intent).collect();
    assert_eq!(kinds, vec![IntentKind::Update, IntentKind::History]);
    assert_eq!(
        response.results[1].result.payload["customer"]["status"],
        "active"
    );
}

#[tokio::test]
async fn test_upgrade_active_customer_refreshes_timestamp() {
    let harness = TestHarness::new().await.unwrap();
    let before = harness.store().fetch_record(2).unwrap();

    let response = harness
        .ask("Upgrade customer 2 and show their tickets")
        .await
        .unwrap();
    assert_eq!(response.results.len(), 2);

    let after = harness.store().fetch_record(2).unwrap();
    assert!(after.updated_at > before.updated_at);
    assert_eq!(
        response.results[1].result.payload["customer"]["updated_at"],
        serde_json::to_value(after.updated_at).unwrap()
    );
}

#[tokio::test]
async fn test_refund_opens_high_priority_ticket() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness
        .ask("I've been charged twice, please refund immediately! Customer ID 1")
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.results.len(), 2);
    let ticket = &response.results[0].result.payload;
    assert_eq!(ticket["priority"], Priority::High.as_str());
    assert_eq!(ticket["status"], "open");
    assert_eq!(harness.store().ticket_count(1).unwrap(), 3);

    let record = &response.results[1];
    assert_eq!(record.intent, IntentKind::Lookup);
    assert_eq!(record.specialist, DATA_SPECIALIST_ID);
    assert_eq!(record.result.payload["id"], 1);
}

#[tokio::test]
async fn test_upgrade_help_fans_out_to_both_specialists() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness
        .ask("I'm customer ID 2 and need help upgrading my account")
        .await
        .unwrap();

    assert!(response.is_success());
    let specialists: Vec<&str> = response
        .results
        .iter()
        .map(|o| o.specialist.as_str())
        .collect();
    assert_eq!(specialists, vec![TICKETING_SPECIALIST_ID, DATA_SPECIALIST_ID]);
    assert_eq!(response.results[1].result.payload["name"], "Bob Standard");
}

#[tokio::test]
async fn test_list_active_customers() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness
        .ask("Show me all active customers who have open tickets")
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.results[0].result.payload["count"], 5);
    assert_eq!(response.results[1].intent, IntentKind::History);
    assert_eq!(response.results[1].result.payload["count"], 5);
}

#[tokio::test]
async fn test_active_customer_without_open_tickets_is_filtered_out() {
    let harness = TestHarness::new().await.unwrap();
    // Charlie becomes active but has never opened a ticket
    harness
        .store()
        .update_record(3, &CustomerUpdate::default().with_status(CustomerStatus::Active))
        .unwrap();

    let response = harness
        .ask("Show me all active customers who have open tickets")
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.results[0].result.payload["count"], 6);
    let filtered = &response.results[1];
    assert_eq!(filtered.specialist, TICKETING_SPECIALIST_ID);
    assert_eq!(filtered.result.payload["count"], 5);
    let ids: Vec<i64> = filtered.result.payload["customers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["id"].as_i64())
        .collect();
    assert!(!ids.contains(&3), "{ids:?}");
}

#[tokio::test]
async fn test_ticket_for_missing_customer_creates_nothing() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness
        .ask("Please open a ticket for customer 999, my login is broken")
        .await
        .unwrap();

    assert_eq!(response.status, AggregateStatus::Failure);
    assert!(response.failures[0].reason.contains("not found"));
    assert_eq!(harness.store().ticket_count(999).unwrap(), 0);
}

#[tokio::test]
async fn test_unclassified_request_is_rejected() {
    let harness = TestHarness::new().await.unwrap();
    let err = harness.ask("hello there").await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Unclassified { .. }));
    assert!(err.to_string().contains("rephrase"));
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_same_intent_resolves_to_same_specialist() {
    let harness = TestHarness::new().await.unwrap();
    let intents = vec![Intent::history(1), Intent::lookup(1)];

    let first = DispatchPlan::build(&intents, harness.directory()).await.unwrap();
    let second = DispatchPlan::build(&intents, harness.directory()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.steps()[0].agent_id, "ticketing-specialist");
    assert_eq!(first.steps()[1].agent_id, "data-specialist");
}

#[tokio::test]
async fn test_ambiguous_route_aborts_request() {
    let harness = TestHarness::builder()
        .with_specialist(
            "local://shadow",
            Arc::new(StubSpecialist::new("shadow-data").with_capability("customer")),
        )
        .build()
        .await
        .unwrap();

    let err = harness.ask("What is the status of customer 1?").await.unwrap_err();
    match err {
        CoordinatorError::AmbiguousRoute { candidates, .. } => {
            assert_eq!(candidates, vec!["data-specialist", "shadow-data"]);
        }
        other => panic!("expected ambiguous route, got {other:?}"),
    }

    // the more specific declaration still wins history
    let response = harness.ask("Show ticket history for customer 1").await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_no_route_fails_before_dispatch() {
    let data = StubSpecialist::new("stub-data").with_capability("customer");
    let harness = TestHarness::builder()
        .without_default_specialists()
        .with_specialist("local://stub-data", Arc::new(data.clone()))
        .with_classifier(scripted(vec![
            Intent::lookup(1),
            Intent::create_ticket(1, "help", None),
        ]))
        .build()
        .await
        .unwrap();

    let err = harness.ask("anything").await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::NoRoute {
            intent: IntentKind::CreateTicket,
            ..
        }
    ));
    assert_eq!(data.call_count(), 0);
}

#[tokio::test]
async fn test_compound_intent_runs_as_pipeline() {
    let harness = TestHarness::builder()
        .with_classifier(scripted(vec![Intent::compound(vec![
            Intent::update(4, CustomerUpdate::default().with_phone("444-000-0000")),
            Intent::history(4),
        ])]))
        .build()
        .await
        .unwrap();

    let response = harness.ask("compound").await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.results.len(), 2);
    assert_eq!(
        response.results[1].result.payload["customer"]["phone"],
        "444-000-0000"
    );
}

// ============================================================================
// Faults
// ============================================================================

#[tokio::test]
async fn test_unreachable_gateway_reported_in_failure() {
    let gateway = Arc::new(UnreachableGateway::new());
    let harness = TestHarness::builder()
        .with_gateway(gateway.clone())
        .build()
        .await
        .unwrap();

    let response = harness.ask("What is the status of customer 1?").await.unwrap();
    assert_eq!(response.status, AggregateStatus::Failure);
    let result = &response.results[0].result;
    assert_eq!(result.status, ResultStatus::Failure);
    assert!(result.message.contains("unreachable"), "{}", result.message);
    // the specialist retried its read once
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn test_failed_prerequisite_skips_dependent_step() {
    let harness = TestHarness::new().await.unwrap();
    let response = harness
        .ask("Update customer ID 999 email to ghost@example.com and show my ticket history")
        .await
        .unwrap();

    assert_eq!(response.status, AggregateStatus::Failure);
    assert_eq!(response.failures.len(), 2);
    assert!(
        response.failures[1].reason.contains("prerequisite step 0"),
        "{}",
        response.failures[1].reason
    );
}

#[tokio::test]
async fn test_slow_specialist_times_out() {
    let stub = StubSpecialist::new("slow-data").with_capability("customer");
    let harness = TestHarness::builder()
        .without_default_specialists()
        .with_specialist(
            "local://slow",
            Arc::new(SlowSpecialist::new(
                Arc::new(stub.clone()),
                Duration::from_millis(300),
            )),
        )
        .with_classifier(scripted(vec![Intent::lookup(1)]))
        .with_config(
            test_config()
                .with_step_timeout(Duration::from_millis(50))
                .with_max_retries(1),
        )
        .build()
        .await
        .unwrap();

    let response = harness.ask("slow").await.unwrap();
    assert_eq!(response.status, AggregateStatus::Failure);
    assert!(response.failures[0].reason.contains("timeout"));
    // both attempts were dropped before the delay elapsed
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn test_cancellation_returns_cancelled_response() {
    let stub = StubSpecialist::new("slow-data").with_capability("customer");
    let harness = TestHarness::builder()
        .without_default_specialists()
        .with_specialist(
            "local://slow",
            Arc::new(SlowSpecialist::new(
                Arc::new(stub),
                Duration::from_millis(500),
            )),
        )
        .with_classifier(scripted(vec![Intent::lookup(1), Intent::lookup(2)]))
        .build()
        .await
        .unwrap();

    let (handle, signal) = CancelSignal::channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let response = harness.ask_with_cancel("slow", signal).await.unwrap();
    assert_eq!(response.status, AggregateStatus::Cancelled);
    assert_eq!(response.results.len(), 2);
    assert!(response.results.iter().all(|o| o.result.is_failure()));
}
