//! Configuration management for the flight assistant.
//!
//! Configuration can be set via environment variables (a `.env` file in the
//! working directory is loaded first by the binaries):
//! - `SERP_API_KEY` - Credential for the SerpAPI flight search. Checked when the tool runs.
//! - `SERPAPI_BASE_URL` - Optional. Defaults to `https://serpapi.com`.
//! - `PROJECT_ENDPOINT` - Required. Hosted agent project endpoint.
//! - `PROJECT_ACCESS_TOKEN` - Optional. Bearer token; the Azure CLI is used when unset.
//! - `MODEL_DEPLOYMENT_NAME` - Optional. Model deployment for the agent. Defaults to `gpt-4o`.
//! - `AGENT_POLL_INTERVAL_MS` - Optional. Run status poll interval. Defaults to `500`.
//! - `AGENT_MAX_POLLS` - Optional. Poll budget per turn. Defaults to `240`.
//! - `HTTP_TIMEOUT_SECS` - Optional. Timeout for every outbound request. Defaults to `60`.
//! - `AZURE_OPENAI_ENDPOINT` / `AZURE_OPENAI_API_KEY` - Chat completion endpoint (probe only).
//! - `AZURE_OPENAI_API_VERSION` - Optional. Defaults to `2024-10-21`.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL_DEPLOYMENT: &str = "gpt-4o";
pub const DEFAULT_SERPAPI_BASE_URL: &str = "https://serpapi.com";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-10-21";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Flight search provider configuration.
#[derive(Debug, Clone)]
pub struct FlightSearchConfig {
    /// SerpAPI key. Absence is only an error once a search is attempted.
    pub provider_credential: Option<String>,

    /// Base URL of the SerpAPI service
    pub base_url: String,
}

impl Default for FlightSearchConfig {
    fn default() -> Self {
        Self {
            provider_credential: None,
            base_url: DEFAULT_SERPAPI_BASE_URL.to_string(),
        }
    }
}

impl FlightSearchConfig {
    pub fn with_credential(api_key: impl Into<String>) -> Self {
        Self {
            provider_credential: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Return the credential, or a configuration error if it is missing or blank.
    pub fn require_credential(&self) -> Result<&str, ConfigError> {
        match self.provider_credential.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingEnvVar("SERP_API_KEY".to_string())),
        }
    }
}

/// Hosted agent service configuration.
#[derive(Debug, Clone)]
pub struct AgentServiceConfig {
    /// Project endpoint of the hosted agent service
    pub project_endpoint: String,

    /// Static bearer token; `None` means "ask the Azure CLI"
    pub access_token: Option<String>,

    /// Model deployment the agent definition is registered with
    pub model_deployment: String,

    /// Delay between run status polls
    pub poll_interval: Duration,

    /// Maximum status polls per turn
    pub max_polls: usize,
}

/// Chat completion endpoint configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Flight search tool settings
    pub flights: FlightSearchConfig,

    /// Hosted agent settings
    pub agent: AgentServiceConfig,

    /// Chat completion settings, only present when both endpoint and key are set
    pub chat: Option<ChatConfig>,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `PROJECT_ENDPOINT` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let flights = FlightSearchConfig {
            provider_credential: var("SERP_API_KEY"),
            base_url: var("SERPAPI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SERPAPI_BASE_URL.to_string()),
        };

        let project_endpoint = var("PROJECT_ENDPOINT")
            .ok_or_else(|| ConfigError::MissingEnvVar("PROJECT_ENDPOINT".to_string()))?;

        let poll_interval_ms: u64 =
            parse_or("AGENT_POLL_INTERVAL_MS", var("AGENT_POLL_INTERVAL_MS"), 500)?;
        let max_polls: usize = parse_or("AGENT_MAX_POLLS", var("AGENT_MAX_POLLS"), 240)?;
        if max_polls == 0 {
            return Err(ConfigError::InvalidValue(
                "AGENT_MAX_POLLS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let agent = AgentServiceConfig {
            project_endpoint,
            access_token: var("PROJECT_ACCESS_TOKEN"),
            model_deployment: var("MODEL_DEPLOYMENT_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_DEPLOYMENT.to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_polls,
        };

        let chat = match (var("AZURE_OPENAI_ENDPOINT"), var("AZURE_OPENAI_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(ChatConfig {
                endpoint,
                api_key,
                api_version: var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let http_timeout_secs: u64 = parse_or("HTTP_TIMEOUT_SECS", var("HTTP_TIMEOUT_SECS"), 60)?;

        Ok(Self {
            flights,
            agent,
            chat,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    /// Chat settings, or an error naming the first missing variable.
    pub fn require_chat(&self) -> Result<&ChatConfig, ConfigError> {
        self.chat.as_ref().ok_or_else(|| {
            ConfigError::MissingEnvVar("AZURE_OPENAI_ENDPOINT / AZURE_OPENAI_API_KEY".to_string())
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = load(&[(
            "PROJECT_ENDPOINT",
            "https://example.services.ai.azure.com/api/projects/p",
        )])
        .expect("config");
        assert_eq!(config.agent.model_deployment, "gpt-4o");
        assert_eq!(config.agent.poll_interval, Duration::from_millis(500));
        assert_eq!(config.agent.max_polls, 240);
        assert_eq!(config.flights.base_url, DEFAULT_SERPAPI_BASE_URL);
        assert!(config.flights.provider_credential.is_none());
        assert!(config.chat.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn missing_project_endpoint_is_an_error() {
        let err = load(&[("SERP_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "PROJECT_ENDPOINT"));
    }

    #[test]
    fn invalid_poll_interval_is_reported() {
        let err = load(&[
            ("PROJECT_ENDPOINT", "https://x"),
            ("AGENT_POLL_INTERVAL_MS", "soon"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue(ref v, _) if v == "AGENT_POLL_INTERVAL_MS")
        );
    }

    #[test]
    fn zero_poll_budget_is_rejected() {
        let err = load(&[("PROJECT_ENDPOINT", "https://x"), ("AGENT_MAX_POLLS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "AGENT_MAX_POLLS"));
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let config =
            load(&[("PROJECT_ENDPOINT", "https://x"), ("SERP_API_KEY", "   ")]).expect("config");
        assert!(config.flights.require_credential().is_err());

        let config = FlightSearchConfig::with_credential("secret");
        assert_eq!(config.require_credential().expect("credential"), "secret");
    }

    #[test]
    fn chat_requires_endpoint_and_key() {
        let config = load(&[
            ("PROJECT_ENDPOINT", "https://x"),
            ("AZURE_OPENAI_ENDPOINT", "https://openai.example"),
        ])
        .expect("config");
        assert!(config.require_chat().is_err());

        let config = load(&[
            ("PROJECT_ENDPOINT", "https://x"),
            ("AZURE_OPENAI_ENDPOINT", "https://openai.example"),
            ("AZURE_OPENAI_API_KEY", "key"),
        ])
        .expect("config");
        let chat = config.require_chat().expect("chat");
        assert_eq!(chat.api_version, DEFAULT_OPENAI_API_VERSION);
    }
}
