//! One conversation with the hosted agent.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::AgentServiceConfig;
use crate::hosted::{
    AgentBackend, AgentDefinition, AgentServiceError, CreateAgentRequest, MessageRole,
    RequiredToolCall, Run, RunStatus, Thread, ToolOutput,
};
use crate::tools::ToolRegistry;

/// Name the agent definition is registered under.
pub const AGENT_NAME: &str = "FlightAssistant";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Service(#[from] AgentServiceError),

    #[error("Run {run_id} ended with status {status}: {message}")]
    RunFailed {
        run_id: String,
        status: RunStatus,
        message: String,
    },

    #[error("Run {0} did not finish within {1} status checks")]
    PollBudgetExhausted(String, usize),

    #[error("Agent returned an empty reply")]
    EmptyReply,
}

/// Settings for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub poll_interval: Duration,
    pub max_polls: usize,
}

impl SessionSettings {
    pub fn from_config(config: &AgentServiceConfig, instructions: String) -> Self {
        Self {
            model: config.model_deployment.clone(),
            name: AGENT_NAME.to_string(),
            instructions,
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
        }
    }
}

/// A registered agent plus the conversation thread, once one exists.
///
/// Call [`Session::close`] when done; it releases the server-side thread and
/// agent definition on a best-effort basis.
pub struct Session {
    backend: Arc<dyn AgentBackend>,
    tools: ToolRegistry,
    agent: AgentDefinition,
    thread: Option<Thread>,
    poll_interval: Duration,
    max_polls: usize,
}

impl Session {
    /// Register the agent definition with the hosted service.
    pub async fn start(
        backend: Arc<dyn AgentBackend>,
        tools: ToolRegistry,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let request = CreateAgentRequest {
            model: settings.model,
            name: settings.name,
            instructions: settings.instructions,
            tools: tools.get_tool_schemas(),
        };
        let agent = backend.create_agent(&request).await?;
        tracing::info!(agent_id = %agent.id, model = %request.model, "Registered agent");

        Ok(Self {
            backend,
            tools,
            agent,
            thread: None,
            poll_interval: settings.poll_interval,
            max_polls: settings.max_polls,
        })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent.id
    }

    /// Continuation handle, absent until the first turn.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.id.as_str())
    }

    /// Send one operator message and wait for the agent's reply.
    pub async fn respond(&mut self, input: &str) -> Result<String, SessionError> {
        let thread_id = self.ensure_thread().await?;

        self.backend.add_message(&thread_id, input).await?;
        let run = self.backend.create_run(&thread_id, &self.agent.id).await?;
        tracing::debug!(run_id = %run.id, "Started run");

        let run = self.drive_run(&thread_id, run).await?;
        self.reply_text(&thread_id, &run.id).await
    }

    async fn ensure_thread(&mut self) -> Result<String, SessionError> {
        if let Some(thread) = &self.thread {
            return Ok(thread.id.clone());
        }
        let thread = self.backend.create_thread().await?;
        tracing::debug!(thread_id = %thread.id, "Created thread");
        let id = thread.id.clone();
        self.thread = Some(thread);
        Ok(id)
    }

    /// Poll the run until it completes, answering tool calls on the way.
    ///
    /// Every fetched run state counts against the budget, and the last one is
    /// still inspected before giving up.
    async fn drive_run(&self, thread_id: &str, mut run: Run) -> Result<Run, SessionError> {
        let mut checks = 0;

        loop {
            match run.status {
                RunStatus::Completed => return Ok(run),
                RunStatus::RequiresAction if checks < self.max_polls => {
                    let calls = run
                        .required_action
                        .as_ref()
                        .and_then(|action| action.submit_tool_outputs.as_ref())
                        .map(|submit| submit.tool_calls.clone())
                        .unwrap_or_default();
                    let outputs = self.execute_tool_calls(&calls).await;
                    run = self
                        .backend
                        .submit_tool_outputs(thread_id, &run.id, &outputs)
                        .await?;
                    checks += 1;
                    continue;
                }
                status if status.is_terminal() => {
                    let message = run
                        .last_error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no error details".to_string());
                    return Err(SessionError::RunFailed {
                        run_id: run.id,
                        status,
                        message,
                    });
                }
                _ => {}
            }

            if checks >= self.max_polls {
                return Err(SessionError::PollBudgetExhausted(run.id, self.max_polls));
            }
            if checks > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
            run = self.backend.get_run(thread_id, &run.id).await?;
            checks += 1;
        }
    }

    /// Run each requested tool call. Failures become `Error: ...` outputs so
    /// the model can explain them to the operator.
    async fn execute_tool_calls(&self, calls: &[RequiredToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());

        for call in calls {
            tracing::info!(
                tool = %call.function.name,
                args = %truncate_for_log(&call.function.arguments, 500),
                "Calling tool"
            );

            let result = match serde_json::from_str(&call.function.arguments) {
                Ok(args) => self.tools.execute(&call.function.name, args).await,
                Err(e) => Err(anyhow::anyhow!("Arguments are not valid JSON: {}", e)),
            };

            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(tool = %call.function.name, "Tool call failed: {}", e);
                    format!("Error: {}", e)
                }
            };
            tracing::debug!(
                tool = %call.function.name,
                result = %truncate_for_log(&output, 1000),
                "Tool result"
            );

            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }

        outputs
    }

    async fn reply_text(&self, thread_id: &str, run_id: &str) -> Result<String, SessionError> {
        let messages = self.backend.list_messages(thread_id, Some(run_id)).await?;

        // Newest first on the wire; present in chronological order.
        let text = messages
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::Assistant)
            .filter(|m| m.run_id.as_deref().map_or(true, |id| id == run_id))
            .map(|m| m.text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if text.is_empty() {
            return Err(SessionError::EmptyReply);
        }
        Ok(text)
    }

    /// Release the thread and the agent definition. Failures are logged and
    /// never returned.
    pub async fn close(self) {
        if let Some(thread) = &self.thread {
            release("thread", &thread.id, self.backend.delete_thread(&thread.id)).await;
        }
        release("agent", &self.agent.id, self.backend.delete_agent(&self.agent.id)).await;
    }
}

async fn release<F>(kind: &str, id: &str, delete: F)
where
    F: std::future::Future<Output = Result<(), AgentServiceError>>,
{
    match delete.await {
        Ok(()) => tracing::debug!(kind, id, "Released"),
        Err(e) => tracing::warn!(kind, id, "Release failed, ignoring: {}", e),
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
