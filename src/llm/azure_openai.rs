//! Azure OpenAI chat completions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChatMessage, ChatResponse, LlmClient, LlmError, Usage};
use crate::config::ChatConfig;

/// Client for one Azure OpenAI deployment.
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: String,
}

impl AzureOpenAiClient {
    pub fn new(config: &ChatConfig, deployment: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            deployment: deployment.to_string(),
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        tracing::debug!(
            deployment = %self.deployment,
            messages = messages.len(),
            "Chat completion"
        );

        let response = self
            .client
            .post(self.api_url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&json!({ "messages": messages }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionBody = response.json().await?;
        let choice = body.choices.into_iter().next().ok_or(LlmError::NoChoices)?;

        Ok(ChatResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: body.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AzureOpenAiClient {
        let config = ChatConfig {
            endpoint: format!("{}/", server.uri()),
            api_key: "aoai-key".to_string(),
            api_version: "2024-10-21".to_string(),
        };
        AzureOpenAiClient::new(&config, "gpt-4o", Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn posts_messages_to_deployment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(query_param("api-version", "2024-10-21"))
            .and(header("api-key", "aoai-key"))
            .and(body_json(json!({
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .chat_completion(&[ChatMessage::system("Be brief."), ChatMessage::user("Hi")])
            .await
            .expect("completion");

        assert_eq!(response.content.as_deref(), Some("Hello!"));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(11));
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "code": "401",
                    "message": "Access denied due to invalid subscription key."
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .chat_completion(&[ChatMessage::user("Hi")])
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.starts_with("Access denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .chat_completion(&[ChatMessage::user("Hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NoChoices));
    }
}
