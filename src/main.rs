//! Flight Assistant - interactive entry point.
//!
//! Registers the agent with the hosted service and chats on stdin/stdout.

use std::sync::Arc;

use flight_assistant::agent::{build_instructions, Session, SessionSettings};
use flight_assistant::hosted::AgentsClient;
use flight_assistant::repl::Termination;
use flight_assistant::tools::{FlightSearchTool, ToolRegistry};
use flight_assistant::{credential, logging, repl, Config};
use tokio::io::BufReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();
    logging::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration: model={}", config.agent.model_deployment);
    if config.flights.provider_credential.is_none() {
        warn!("SERP_API_KEY is not set; flight searches will fail until it is");
    }

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(FlightSearchTool::serpapi(
        config.flights.clone(),
        config.http_timeout,
    )?));

    let backend = Arc::new(AgentsClient::new(
        &config.agent.project_endpoint,
        credential::from_config(&config.agent),
        config.http_timeout,
    )?);

    let instructions = build_instructions(chrono::Local::now().date_naive(), &tools);
    let session = Session::start(
        backend,
        tools,
        SessionSettings::from_config(&config.agent, instructions),
    )
    .await?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let outcome = repl::run(
        session,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await?;
    info!(turns = outcome.turns, "Session ended: {:?}", outcome.termination);

    // The stdin reader thread is still blocked on a read; don't wait for it.
    if outcome.termination == Termination::Interrupted {
        std::process::exit(130);
    }

    Ok(())
}
