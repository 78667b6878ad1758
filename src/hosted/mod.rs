//! Adapter for the hosted agent service.
//!
//! The hosted service owns the model, the conversation thread and the
//! decision to call tools. This module exposes its operations through the
//! [`AgentBackend`] trait so the session logic can run against the real REST
//! client or a scripted double.

mod client;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

use crate::credential::CredentialError;

pub use client::{AgentsClient, API_VERSION};
pub use types::{
    AgentDefinition, Connection, CreateAgentRequest, MessageRole, RequiredToolCall, Run,
    RunStatus, Thread, ThreadMessage, ToolOutput,
};

#[derive(Debug, Error)]
pub enum AgentServiceError {
    #[error("Invalid project endpoint {0}: {1}")]
    InvalidEndpoint(String, String),

    #[error("Could not obtain an access token: {0}")]
    Credential(#[from] CredentialError),

    #[error("HTTP error talking to the agent service: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected agent service response: {0}")]
    Decode(String),
}

/// Operations of the hosted agent service used by a chat session.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<AgentDefinition, AgentServiceError>;

    async fn delete_agent(&self, agent_id: &str) -> Result<(), AgentServiceError>;

    async fn create_thread(&self) -> Result<Thread, AgentServiceError>;

    async fn delete_thread(&self, thread_id: &str) -> Result<(), AgentServiceError>;

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AgentServiceError>;

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, AgentServiceError>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentServiceError>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AgentServiceError>;

    /// Messages of a thread, newest first, optionally limited to one run.
    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>, AgentServiceError>;
}
