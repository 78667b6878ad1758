//! Flight search tool backed by the SerpAPI Google Flights engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::serpapi::{SearchParams, SearchProvider, SerpApiProvider};
use super::{ParamKind, ParamSpec, Tool, ToolDescriptor};
use crate::config::{ConfigError, FlightSearchConfig};

pub const TOOL_NAME: &str = "search_flights";
const ENGINE: &str = "google_flights";

#[derive(Debug, Error)]
pub enum FlightSearchError {
    #[error("Flight search is not configured: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid search_flights arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("Flight search provider failed: {0:#}")]
    Provider(anyhow::Error),
}

/// Trip kind, encoded with the provider's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TripType {
    RoundTrip,
    OneWay,
}

impl TripType {
    pub fn code(self) -> u8 {
        match self {
            Self::RoundTrip => 1,
            Self::OneWay => 2,
        }
    }
}

impl TryFrom<u8> for TripType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::RoundTrip),
            2 => Ok(Self::OneWay),
            other => Err(format!(
                "unknown trip type {} (1 = round trip, 2 = one way)",
                other
            )),
        }
    }
}

impl From<TripType> for u8 {
    fn from(trip: TripType) -> Self {
        trip.code()
    }
}

/// Arguments of one `search_flights` call, as sent by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    pub departure: String,
    #[serde(rename = "type")]
    pub trip_type: TripType,
    pub arrival: String,
    pub outbound_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
}

/// Build the outbound SerpAPI parameter mapping.
///
/// `return_date` is only forwarded for round trips. A round trip without a
/// return date is still sent as-is; the provider decides what to do with it.
pub fn build_search_params(api_key: &str, request: &FlightSearchRequest) -> SearchParams {
    let mut params = SearchParams::new();
    params.insert("api_key", api_key);
    params.insert("engine", ENGINE);
    params.insert("departure_id", request.departure.as_str());
    params.insert("arrival_id", request.arrival.as_str());
    params.insert("outbound_date", request.outbound_date.as_str());
    params.insert("type", request.trip_type.code());
    params.insert("hl", "en");
    params.insert("gl", "us");
    params.insert("currency", "USD");

    if request.trip_type == TripType::RoundTrip {
        if let Some(date) = request.return_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("return_date", date);
        }
    }

    params
}

/// The `search_flights` capability.
pub struct FlightSearchTool {
    config: FlightSearchConfig,
    provider: Arc<dyn SearchProvider>,
    descriptor: ToolDescriptor,
}

impl FlightSearchTool {
    pub fn new(config: FlightSearchConfig, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            config,
            provider,
            descriptor: descriptor(),
        }
    }

    /// Tool wired to the real SerpAPI endpoint named in the config.
    pub fn serpapi(config: FlightSearchConfig, timeout: Duration) -> anyhow::Result<Self> {
        let provider = SerpApiProvider::new(config.base_url.clone(), timeout)?;
        Ok(Self::new(config, Arc::new(provider)))
    }

    /// Run one search and return the provider payload as JSON text.
    pub async fn search(
        &self,
        request: &FlightSearchRequest,
    ) -> Result<String, FlightSearchError> {
        let api_key = self.config.require_credential()?;
        let params = build_search_params(api_key, request);

        tracing::info!(
            departure = %request.departure,
            arrival = %request.arrival,
            outbound_date = %request.outbound_date,
            trip_type = request.trip_type.code(),
            "Searching flights"
        );

        let payload = self
            .provider
            .search(&params)
            .await
            .map_err(FlightSearchError::Provider)?;

        Ok(payload.get().to_string())
    }
}

#[async_trait]
impl Tool for FlightSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let request: FlightSearchRequest =
            serde_json::from_value(args).map_err(FlightSearchError::InvalidArguments)?;
        Ok(self.search(&request).await?)
    }
}

fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: TOOL_NAME,
        description: "Search for flights using Google Flights via SerpAPI. Returns the raw search results as JSON.",
        params: vec![
            ParamSpec::required(
                "departure",
                ParamKind::String,
                "Departure airport code (e.g., LAX)",
            ),
            ParamSpec::required(
                "type",
                ParamKind::Integer,
                "One way or round trip. Round trip is 1, one way is 2",
            )
            .with_allowed(vec![json!(1), json!(2)]),
            ParamSpec::required("arrival", ParamKind::String, "Arrival airport code (e.g., JFK)"),
            ParamSpec::required(
                "outbound_date",
                ParamKind::String,
                "Departure date (YYYY-MM-DD)",
            ),
            ParamSpec::optional(
                "return_date",
                ParamKind::String,
                "Return date (YYYY-MM-DD) for round trips",
            ),
        ],
    }
}
