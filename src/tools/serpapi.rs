//! SerpAPI transport for the flight search tool.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Outbound parameter mapping for one provider call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams(Map<String, Value>);

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Flatten into query-string pairs. Strings are sent bare, everything else
    /// in its JSON text form.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}

/// Something that can answer a flight search with the provider's JSON payload.
///
/// The payload is kept as the provider's own text so numbers of any size
/// come back exactly as sent.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, params: &SearchParams) -> anyhow::Result<Box<RawValue>>;
}

/// HTTP client for `GET {base_url}/search.json`.
#[derive(Clone)]
pub struct SerpApiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl SerpApiProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flight-assistant/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search.json", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(&self, params: &SearchParams) -> anyhow::Result<Box<RawValue>> {
        let engine = params.get("engine").and_then(Value::as_str).unwrap_or("");
        tracing::debug!(engine, "Calling SerpAPI");

        let response = self
            .client
            .get(self.search_url())
            .query(&params.to_query_pairs())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // Error payloads are JSON too and are handed back untouched.
        serde_json::from_str(&body).map_err(|e| {
            anyhow::anyhow!("SerpAPI returned a non-JSON body (status {}): {}", status, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_params() -> SearchParams {
        let mut params = SearchParams::new();
        params.insert("engine", "google_flights");
        params.insert("departure_id", "LAX");
        params.insert("type", 2);
        params
    }

    #[test]
    fn query_pairs_render_numbers_without_quotes() {
        let pairs = sample_params().to_query_pairs();
        assert!(pairs.contains(&("type".to_string(), "2".to_string())));
        assert!(pairs.contains(&("departure_id".to_string(), "LAX".to_string())));
    }

    #[tokio::test]
    async fn search_sends_params_as_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("engine", "google_flights"))
            .and(query_param("departure_id", "LAX"))
            .and(query_param("type", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "best_flights": [{"price": 199}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = SerpApiProvider::new(server.uri(), Duration::from_secs(5)).expect("client");
        let payload = provider.search(&sample_params()).await.expect("search");
        let payload: Value = serde_json::from_str(payload.get()).expect("json");
        assert_eq!(payload["best_flights"][0]["price"], 199);
    }

    #[tokio::test]
    async fn error_shaped_json_is_returned_as_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid API key."})),
            )
            .mount(&server)
            .await;

        let provider = SerpApiProvider::new(server.uri(), Duration::from_secs(5)).expect("client");
        let payload = provider.search(&sample_params()).await.expect("payload");
        assert_eq!(payload.get(), r#"{"error":"Invalid API key."}"#);
    }

    #[tokio::test]
    async fn body_text_is_kept_verbatim() {
        let body = r#"{"search_id":123456789012345678901234567890,"fare":0.10,"legs":[]}"#;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let provider = SerpApiProvider::new(server.uri(), Duration::from_secs(5)).expect("client");
        let payload = provider.search(&sample_params()).await.expect("search");
        assert_eq!(payload.get(), body);
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let provider = SerpApiProvider::new(server.uri(), Duration::from_secs(5)).expect("client");
        let err = provider.search(&sample_params()).await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
