//! REST client for the hosted agent service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use super::types::{
    AgentDefinition, Connection, ConnectionList, CreateAgentRequest, ListResponse, Run, Thread,
    ThreadMessage, ToolOutput,
};
use super::{AgentBackend, AgentServiceError};
use crate::credential::TokenProvider;

/// API version sent with every request.
pub const API_VERSION: &str = "v1";

/// Newest-first page size when fetching the reply of a run.
const MESSAGE_PAGE_SIZE: &str = "20";

/// Client for a hosted agent project endpoint, e.g.
/// `https://<resource>.services.ai.azure.com/api/projects/<project>`.
#[derive(Clone)]
pub struct AgentsClient {
    client: Client,
    endpoint: String,
    credential: Arc<dyn TokenProvider>,
}

impl AgentsClient {
    pub fn new(
        endpoint: &str,
        credential: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, AgentServiceError> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| AgentServiceError::InvalidEndpoint(endpoint.to_string(), e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AgentServiceError::InvalidEndpoint(
                endpoint.to_string(),
                "expected an http(s) URL".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credential,
        })
    }

    /// Connections registered on the project.
    pub async fn list_connections(&self) -> Result<Vec<Connection>, AgentServiceError> {
        let list: ConnectionList = self.request(Method::GET, "connections", &[], None).await?;
        Ok(list.value)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, AgentServiceError> {
        let token = self.credential.token().await?;

        tracing::debug!(method = method.as_str(), path, "Agent service request");

        let mut request = self
            .client
            .request(method, self.url(path))
            .query(&[("api-version", API_VERSION)])
            .query(query)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AgentServiceError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        // Some deletes answer with an empty body.
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text)
            .map_err(|e| AgentServiceError::Decode(format!("{} ({})", e, path)))
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error").and_then(|e| match e {
                Value::String(s) => Some(s.clone()),
                other => other.get("message").and_then(Value::as_str).map(String::from),
            })
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl AgentBackend for AgentsClient {
    async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<AgentDefinition, AgentServiceError> {
        let body = serde_json::to_value(request)
            .map_err(|e| AgentServiceError::Decode(e.to_string()))?;
        self.request(Method::POST, "assistants", &[], Some(body)).await
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), AgentServiceError> {
        let _: Value = self
            .request(Method::DELETE, &format!("assistants/{}", agent_id), &[], None)
            .await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<Thread, AgentServiceError> {
        self.request(Method::POST, "threads", &[], Some(json!({}))).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), AgentServiceError> {
        let _: Value = self
            .request(Method::DELETE, &format!("threads/{}", thread_id), &[], None)
            .await?;
        Ok(())
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AgentServiceError> {
        let _: Value = self
            .request(
                Method::POST,
                &format!("threads/{}/messages", thread_id),
                &[],
                Some(json!({ "role": "user", "content": content })),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, AgentServiceError> {
        self.request(
            Method::POST,
            &format!("threads/{}/runs", thread_id),
            &[],
            Some(json!({ "assistant_id": agent_id })),
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentServiceError> {
        self.request(
            Method::GET,
            &format!("threads/{}/runs/{}", thread_id, run_id),
            &[],
            None,
        )
        .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AgentServiceError> {
        self.request(
            Method::POST,
            &format!("threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &[],
            Some(json!({ "tool_outputs": outputs })),
        )
        .await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>, AgentServiceError> {
        let mut query = vec![("order", "desc"), ("limit", MESSAGE_PAGE_SIZE)];
        if let Some(run_id) = run_id {
            query.push(("run_id", run_id));
        }

        let page: ListResponse<ThreadMessage> = self
            .request(
                Method::GET,
                &format!("threads/{}/messages", thread_id),
                &query,
                None,
            )
            .await?;
        Ok(page.data)
    }
}
