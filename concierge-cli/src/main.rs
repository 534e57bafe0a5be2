use clap::{Parser, Subcommand};
use concierge_agent::SpecialistKind;
use std::path::PathBuf;

mod commands;
mod demo;
mod error;
mod shutdown;

use commands::{
    AskArgs, CoordinatorArgs, GatewayArgs, SpecialistArgs, run_ask, run_coordinator, run_gateway,
    run_specialist,
};
use demo::run_demo;
use error::CliResult;

#[derive(Parser, Debug)]
#[command(name = "concierge", version)]
#[command(about = "Concierge - multi-agent customer-service coordination")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the tool gateway over a SQLite store
    Gateway {
        /// Bind address (default: 127.0.0.1:8000)
        #[arg(long)]
        addr: Option<String>,
        /// SQLite database file (default: concierge.db)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Load the demo data set on startup
        #[arg(long, conflicts_with = "no_seed")]
        seed: bool,
        /// Start with the store as it is
        #[arg(long)]
        no_seed: bool,
    },
    /// Serve one specialist agent
    Specialist {
        /// data or ticketing
        #[arg(long)]
        kind: SpecialistKind,
        /// Bind address (default: 127.0.0.1:9300 for data, 127.0.0.1:9301 for ticketing)
        #[arg(long)]
        addr: Option<String>,
        /// Tool gateway base URL
        #[arg(long)]
        gateway: Option<String>,
        /// URL advertised on the agent card
        #[arg(long)]
        public_url: Option<String>,
    },
    /// Serve the coordinator
    Coordinator {
        /// Bind address (default: 127.0.0.1:9400)
        #[arg(long)]
        addr: Option<String>,
        /// Specialist base URL to register; repeat for each specialist
        #[arg(long = "specialist")]
        specialists: Vec<String>,
    },
    /// Send one request to a running coordinator
    Ask {
        /// Request text
        text: String,
        /// Coordinator base URL
        #[arg(long, default_value = "http://127.0.0.1:9400")]
        coordinator: String,
        /// Session identifier (generated when omitted)
        #[arg(long)]
        session: Option<String>,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the reference scenarios against an in-process stack
    Demo,
}

async fn run(command: Commands) -> CliResult<bool> {
    match command {
        Commands::Gateway {
            addr,
            db,
            seed,
            no_seed,
        } => {
            let seed = match (seed, no_seed) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            run_gateway(GatewayArgs { addr, db, seed }).await?;
        }
        Commands::Specialist {
            kind,
            addr,
            gateway,
            public_url,
        } => {
            run_specialist(SpecialistArgs {
                kind,
                addr,
                gateway,
                public_url,
            })
            .await?;
        }
        Commands::Coordinator { addr, specialists } => {
            run_coordinator(CoordinatorArgs { addr, specialists }).await?;
        }
        Commands::Ask {
            text,
            coordinator,
            session,
            json,
        } => {
            run_ask(AskArgs {
                coordinator,
                text,
                session,
                json,
            })
            .await?;
        }
        Commands::Demo => return Ok(run_demo().await? == 0),
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            std::process::exit(1);
        }
    }
}
