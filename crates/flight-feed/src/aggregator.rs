// Copyright 2025 Fleetwatch Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Client for a commercial flight-data aggregator API.
//!
//! Authenticates with a bearer token (environment variable or explicit) and
//! classifies the aggregator's billing/limit status codes into typed errors.
//! Response envelopes are tolerant: missing optional fields default rather
//! than failing the whole payload.

use chrono::{NaiveDate, Utc};
use log::{debug, info};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{FlightStatus, GeoBounds, PositionRecord};

/// Default aggregator API base URL.
pub const DEFAULT_BASE_URL: &str = "https://fr24api.flightradar24.com/api";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "FLEETWATCH_AGGREGATOR_TOKEN";

const API_VERSION: &str = "v1";

/// Errors from the aggregator API.
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("no aggregator token configured (set {TOKEN_ENV_VAR})")]
    MissingToken,

    #[error("unauthorized: check the API token")]
    Unauthorized,

    #[error("insufficient API credits")]
    InsufficientCredits,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("aggregator returned status {status}")]
    Api { status: u16 },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Map a response status to an error, or `None` for success.
fn classify_status(status: StatusCode) -> Option<AggregatorError> {
    match status.as_u16() {
        401 => Some(AggregatorError::Unauthorized),
        402 => Some(AggregatorError::InsufficientCredits),
        429 => Some(AggregatorError::RateLimited),
        code if !status.is_success() => Some(AggregatorError::Api { status: code }),
        _ => None,
    }
}

/// Flight as returned by the aggregator's live-positions endpoint.
#[derive(Debug, Default, Deserialize)]
struct AggregatorFlight {
    #[serde(default)]
    id: String,
    #[serde(default)]
    callsign: String,
    #[serde(default)]
    registration: String,
    #[serde(default)]
    aircraft: AggregatorAircraft,
    #[serde(default)]
    airline: AggregatorNamed,
    #[serde(default)]
    departure: AggregatorCoded,
    #[serde(default)]
    arrival: AggregatorCoded,
    #[serde(default)]
    status: String,
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
    #[serde(default)]
    altitude: i32,
    #[serde(default)]
    speed: i32,
    #[serde(default)]
    heading: f64,
}

#[derive(Debug, Default, Deserialize)]
struct AggregatorAircraft {
    #[serde(default, alias = "model")]
    r#type: String,
}

#[derive(Debug, Default, Deserialize)]
struct AggregatorNamed {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AggregatorCoded {
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct LivePositionsEnvelope {
    #[serde(default)]
    data: Vec<AggregatorFlight>,
}

impl From<AggregatorFlight> for PositionRecord {
    fn from(flight: AggregatorFlight) -> Self {
        Self {
            flight_id: flight.id,
            callsign: flight.callsign,
            registration: flight.registration,
            aircraft_type: flight.aircraft.r#type,
            airline: flight.airline.name,
            origin: flight.departure.code,
            destination: flight.arrival.code,
            status: FlightStatus::parse(&flight.status),
            latitude: flight.latitude,
            longitude: flight.longitude,
            altitude: flight.altitude,
            speed: flight.speed,
            heading: flight.heading,
            last_updated: Utc::now(),
        }
    }
}

/// Schedule-level details for one aggregator flight.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregatorFlightDetails {
    #[serde(default)]
    pub flight_id: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub scheduled_departure: Option<String>,
    #[serde(default)]
    pub scheduled_arrival: Option<String>,
    #[serde(default)]
    pub actual_departure: Option<String>,
    #[serde(default)]
    pub actual_arrival: Option<String>,
    #[serde(default)]
    pub status: String,
}

/// Authenticated aggregator API client.
#[derive(Debug, Clone)]
pub struct AggregatorClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl AggregatorClient {
    /// Create a client with an explicit bearer token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Create a client against a non-default base URL.
    #[must_use]
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }

    /// Create a client from the [`TOKEN_ENV_VAR`] environment variable.
    pub fn from_env() -> Result<Self, AggregatorError> {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token)),
            _ => Err(AggregatorError::MissingToken),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, AggregatorError> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header("Accept-Version", API_VERSION)
            .query(params)
            .send()
            .await?;

        if let Some(error) = classify_status(response.status()) {
            return Err(error);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch live flight positions, optionally scoped to a bounding box.
    pub async fn live_positions(
        &self,
        bounds: Option<GeoBounds>,
    ) -> Result<Vec<PositionRecord>, AggregatorError> {
        let mut params = Vec::new();
        if let Some(bounds) = bounds {
            params.push(("bounds", bounds.to_query()));
        }

        let envelope: LivePositionsEnvelope = self
            .get_json("/live/flight-positions/light", &params)
            .await?;

        let records: Vec<PositionRecord> =
            envelope.data.into_iter().map(PositionRecord::from).collect();
        info!("Fetched {} live flights from aggregator", records.len());
        Ok(records)
    }

    /// Fetch schedule-level details for one flight.
    pub async fn flight_details(
        &self,
        flight_id: &str,
    ) -> Result<AggregatorFlightDetails, AggregatorError> {
        self.get_json(&format!("/live/flight-details/{flight_id}"), &[])
            .await
    }

    /// Fetch the raw historical track for a flight on a given date.
    pub async fn historical_flight(
        &self,
        flight_id: &str,
        date: NaiveDate,
    ) -> Result<serde_json::Value, AggregatorError> {
        self.get_json(
            &format!("/flights/historical/{flight_id}"),
            &[("date", date.format("%Y-%m-%d").to_string())],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(AggregatorError::Unauthorized)
        ));
        assert!(matches!(
            classify_status(StatusCode::PAYMENT_REQUIRED),
            Some(AggregatorError::InsufficientCredits)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(AggregatorError::RateLimited)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(AggregatorError::Api { status: 500 })
        ));
        assert!(classify_status(StatusCode::OK).is_none());
    }

    #[test]
    fn test_envelope_tolerates_sparse_flights() {
        let envelope: LivePositionsEnvelope = serde_json::from_str(
            r#"{"data": [{"id": "x1", "callsign": "AAL12", "latitude": 4.6, "longitude": -74.1}]}"#,
        )
        .unwrap();
        let record = PositionRecord::from(envelope.data.into_iter().next().unwrap());

        assert_eq!(record.flight_id, "x1");
        assert_eq!(record.registration, "");
        assert_eq!(record.status, FlightStatus::Other(String::new()));
        assert!((record.latitude - 4.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_envelope_without_data_is_empty() {
        let envelope: LivePositionsEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn test_from_env_requires_token() {
        // Serialized in one test to avoid racing the process environment.
        std::env::remove_var(TOKEN_ENV_VAR);
        assert!(matches!(
            AggregatorClient::from_env(),
            Err(AggregatorError::MissingToken)
        ));

        std::env::set_var(TOKEN_ENV_VAR, "   ");
        assert!(matches!(
            AggregatorClient::from_env(),
            Err(AggregatorError::MissingToken)
        ));

        std::env::set_var(TOKEN_ENV_VAR, "secret-token");
        assert!(AggregatorClient::from_env().is_ok());
        std::env::remove_var(TOKEN_ENV_VAR);
    }
}
