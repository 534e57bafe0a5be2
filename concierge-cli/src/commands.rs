use crate::error::CliResult;
use crate::shutdown::shutdown_signal;
use concierge_agent::{HttpTransport, SpecialistConfig, SpecialistKind, SpecialistServer};
use concierge_coordinator::{
    AgentDirectory, AskRequest, Coordinator, CoordinatorClient, CoordinatorConfig,
    CoordinatorServer, RuleClassifier,
};
use concierge_core::AggregatedResponse;
use concierge_gateway::{GatewayConfig, GatewayServer, LocalGateway, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

// ============================================================================
// Servers
// ============================================================================

pub struct GatewayArgs {
    pub addr: Option<String>,
    pub db: Option<PathBuf>,
    pub seed: Option<bool>,
}

pub async fn run_gateway(args: GatewayArgs) -> CliResult<()> {
    let mut config = GatewayConfig::from_env()?;
    if let Some(addr) = args.addr {
        config = config.bind_addr(addr);
    }
    if let Some(db) = args.db {
        config = config.db_path(db);
    }
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }
    config.validate()?;

    let store = Store::open(&config.db_path)?.with_list_limit(config.list_limit);
    if config.seed {
        let report = store.seed()?;
        info!(
            customers = report.customers,
            tickets = report.tickets,
            db = %config.db_path.display(),
            "Store ready"
        );
    }

    let listener = TcpListener::bind(&config.bind_addr).await?;
    GatewayServer::new(Arc::new(LocalGateway::new(Arc::new(store))))
        .serve_with_shutdown(listener, shutdown_signal())
        .await?;
    Ok(())
}

pub struct SpecialistArgs {
    pub kind: SpecialistKind,
    pub addr: Option<String>,
    pub gateway: Option<String>,
    pub public_url: Option<String>,
}

pub async fn run_specialist(args: SpecialistArgs) -> CliResult<()> {
    let mut config = SpecialistConfig::from_env(args.kind)?;
    if let Some(addr) = args.addr {
        config.bind_addr = addr;
    }
    if let Some(gateway) = args.gateway {
        config.gateway_url = gateway;
    }
    if args.public_url.is_some() {
        config.public_url = args.public_url;
    }
    config.validate()?;

    let specialist = config.connect().await?;
    let listener = TcpListener::bind(&config.bind_addr).await?;
    SpecialistServer::from_arc(specialist)
        .serve_with_shutdown(listener, shutdown_signal())
        .await?;
    Ok(())
}

pub struct CoordinatorArgs {
    pub addr: Option<String>,
    pub specialists: Vec<String>,
}

pub async fn run_coordinator(args: CoordinatorArgs) -> CliResult<()> {
    let mut config = CoordinatorConfig::from_env()?;
    if let Some(addr) = args.addr {
        config = config.with_bind_addr(addr);
    }
    if !args.specialists.is_empty() {
        config = config.with_specialists(args.specialists);
    }
    config.validate()?;

    let transport = Arc::new(HttpTransport::new()?);
    let directory = Arc::new(AgentDirectory::new(transport.clone()));
    let bind_addr = config.bind_addr.clone();
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(RuleClassifier::new()),
        directory,
        transport,
        config,
    ));

    let registered = coordinator.discover_configured().await?;
    if registered == 0 {
        warn!("No specialists registered; every request will fail to route");
    }

    let listener = TcpListener::bind(&bind_addr).await?;
    CoordinatorServer::new(coordinator)
        .with_public_url(format!("http://{bind_addr}"))
        .serve_with_shutdown(listener, shutdown_signal())
        .await?;
    Ok(())
}

// ============================================================================
// Client
// ============================================================================

pub struct AskArgs {
    pub coordinator: String,
    pub text: String,
    pub session: Option<String>,
    pub json: bool,
}

pub async fn run_ask(args: AskArgs) -> CliResult<()> {
    let client = CoordinatorClient::new(&args.coordinator)?;
    let mut request = AskRequest::new(args.text);
    if let Some(session) = args.session {
        request = request.with_session(session);
    }

    let response = client.ask(&request).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

pub fn print_response(response: &AggregatedResponse) {
    println!("[{}] session {}", response.status, response.session_id);
    println!("{}", response.narrative);
}
