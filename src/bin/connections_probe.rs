//! Connections probe - lists the hosted project's connections and makes one
//! chat completion call to check that both endpoints are reachable.

use flight_assistant::hosted::AgentsClient;
use flight_assistant::llm::{AzureOpenAiClient, ChatMessage, LlmClient};
use flight_assistant::{credential, logging, Config};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();

    let config = Config::from_env()?;

    let client = AgentsClient::new(
        &config.agent.project_endpoint,
        credential::from_config(&config.agent),
        config.http_timeout,
    )?;

    let connections = client.list_connections().await?;
    println!("Connections ({}):", connections.len());
    for connection in &connections {
        println!(
            "- {} [{}]{}",
            connection.name,
            connection.connection_type.as_deref().unwrap_or("unknown"),
            if connection.is_default { " (default)" } else { "" }
        );
    }

    let chat = AzureOpenAiClient::new(
        config.require_chat()?,
        &config.agent.model_deployment,
        config.http_timeout,
    )?;
    let response = chat
        .chat_completion(&[
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Say hello and name one busy airport."),
        ])
        .await?;

    if let Some(usage) = &response.usage {
        info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Chat completion finished"
        );
    }
    println!("\nAssistant: {}", response.content.unwrap_or_default());

    Ok(())
}
