//! Bearer tokens for the hosted agent service.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::config::AgentServiceConfig;

/// Audience of tokens accepted by the hosted agent service.
pub const AGENTS_RESOURCE: &str = "https://ai.azure.com";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to run the Azure CLI: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Azure CLI error: {0}")]
    Cli(String),

    #[error("Unexpected Azure CLI output: {0}")]
    Parse(String),
}

/// A bearer token and when it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(REFRESH_MARGIN_MINUTES) < self.expires_at
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, CredentialError>;
}

/// A fixed token, typically from `PROJECT_ACCESS_TOKEN`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, CredentialError> {
        Ok(self.0.clone())
    }
}

/// Tokens obtained from the signed-in Azure CLI, cached until close to expiry.
pub struct AzureCliCredential {
    resource: String,
    cached: Mutex<Option<AccessToken>>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::for_resource(AGENTS_RESOURCE)
    }

    pub fn for_resource(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<AccessToken, CredentialError> {
        tracing::debug!(resource = %self.resource, "Requesting token from Azure CLI");

        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--output",
                "json",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CredentialError::Cli(stderr.trim().to_string()));
        }

        parse_cli_token(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    async fn token(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }

        let token = self.fetch().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Static token when one is configured, otherwise the Azure CLI.
pub fn from_config(config: &AgentServiceConfig) -> Arc<dyn TokenProvider> {
    match &config.access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => {
            tracing::debug!("PROJECT_ACCESS_TOKEN not set, using Azure CLI credential");
            Arc::new(AzureCliCredential::new())
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix seconds; only printed by newer CLI versions.
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
    /// Local wall-clock time, e.g. `2026-10-19 13:05:44.000000`.
    expires_on: Option<String>,
}

/// Parse `az account get-access-token --output json`.
pub fn parse_cli_token(raw: &str) -> Result<AccessToken, CredentialError> {
    let parsed: CliToken =
        serde_json::from_str(raw).map_err(|e| CredentialError::Parse(e.to_string()))?;

    let expires_at = if let Some(epoch) = parsed.expires_on_epoch {
        Utc.timestamp_opt(epoch, 0)
            .single()
            .ok_or_else(|| CredentialError::Parse(format!("invalid expires_on {}", epoch)))?
    } else if let Some(local) = parsed.expires_on.as_deref() {
        let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| CredentialError::Parse(format!("invalid expiresOn {}: {}", local, e)))?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| CredentialError::Parse(format!("invalid expiresOn {}", local)))?
            .with_timezone(&Utc)
    } else {
        return Err(CredentialError::Parse("missing token expiry".to_string()));
    };

    Ok(AccessToken {
        token: parsed.access_token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epoch_expiry() {
        let token = parse_cli_token(
            r#"{"accessToken":"abc","expiresOn":"2026-10-19 13:05:44.000000","expires_on":1792415144,"tokenType":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(token.token, "abc");
        assert_eq!(token.expires_at.timestamp(), 1_792_415_144);
    }

    #[test]
    fn falls_back_to_local_expiry() {
        let token =
            parse_cli_token(r#"{"accessToken":"abc","expiresOn":"2026-10-19 13:05:44.000000"}"#)
                .unwrap();
        let expected = Local
            .with_ymd_and_hms(2026, 10, 19, 13, 5, 44)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(token.expires_at, expected);
    }

    #[test]
    fn rejects_output_without_expiry() {
        let err = parse_cli_token(r#"{"accessToken":"abc"}"#).unwrap_err();
        assert!(matches!(err, CredentialError::Parse(_)));
    }

    #[test]
    fn tokens_near_expiry_are_stale() {
        let now = Utc::now();
        let fresh = AccessToken {
            token: "t".to_string(),
            expires_at: now + Duration::minutes(30),
        };
        let stale = AccessToken {
            token: "t".to_string(),
            expires_at: now + Duration::minutes(2),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let provider = StaticToken::new("fixed");
        assert_eq!(provider.token().await.unwrap(), "fixed");
    }
}
