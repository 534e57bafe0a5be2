//! The five reference conversations, run against a throwaway stack.

use crate::commands::print_response;
use crate::error::CliResult;
use concierge_coordinator::AskRequest;
use concierge_testing::HttpStack;
use tracing::{error, info};

struct Scenario {
    name: &'static str,
    text: &'static str,
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "Simple lookup",
        text: "Get customer information for ID 1",
    },
    Scenario {
        name: "Account upgrade help",
        text: "I'm customer ID 2 and need help upgrading my account",
    },
    Scenario {
        name: "Active customers",
        text: "Show me all active customers who have open tickets",
    },
    Scenario {
        name: "Refund escalation",
        text: "I've been charged twice, please refund immediately! Customer ID 1",
    },
    Scenario {
        name: "Update then history",
        text: "Update customer ID 5 email to newemail@example.com and show my ticket history",
    },
];

/// Returns the number of scenarios that did not get a response
pub async fn run_demo() -> CliResult<usize> {
    let stack = HttpStack::start().await?;
    info!(coordinator = %stack.coordinator_url, "Demo stack running");
    let client = stack.client()?;

    let mut errors = 0;
    for (index, scenario) in SCENARIOS.iter().enumerate() {
        println!("\n=== {}. {} ===", index + 1, scenario.name);
        println!("> {}", scenario.text);
        let request = AskRequest::new(scenario.text).with_session(format!("demo-{}", index + 1));
        match client.ask(&request).await {
            Ok(response) => print_response(&response),
            Err(e) => {
                error!(scenario = scenario.name, error = %e, "Scenario failed");
                errors += 1;
            }
        }
    }

    stack.shutdown().await;
    println!(
        "\n{} of {} scenarios answered",
        SCENARIOS.len() - errors,
        SCENARIOS.len()
    );
    Ok(errors)
}
