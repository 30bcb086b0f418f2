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

//! REST provider for the flight-data HTTP API.
//!
//! Endpoints:
//! - `GET /flight-data/live-flights[?bounds=lat1,lat2,lon1,lon2]`
//! - `GET /flight-data/data-source`
//! - `GET /flight-data/flight-details/{id}`

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{FlightDataProvider, ProviderError};
use crate::model::{FlightDetails, GeoBounds, PositionRecord, Provenance};

/// Provider backed by a remote flight-data HTTP API.
#[derive(Debug, Clone)]
pub struct RestProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DataSourceResponse {
    using_real_data: bool,
    #[serde(default)]
    source: Option<String>,
}

impl RestProvider {
    /// Create a provider for the given base URL (scheme + host + port).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a provider reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_bytes(&self, url: &str, flight_id: Option<&str>) -> Result<Vec<u8>, ProviderError> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some(flight_id) = flight_id {
                return Err(ProviderError::NotFound {
                    flight_id: flight_id.to_owned(),
                });
            }
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                code: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl FlightDataProvider for RestProvider {
    async fn live_flights(
        &self,
        bounds: Option<GeoBounds>,
    ) -> Result<Vec<PositionRecord>, ProviderError> {
        let mut url = self.url("/flight-data/live-flights");
        if let Some(bounds) = bounds {
            url = format!("{url}?bounds={}", bounds.to_query());
        }

        let body = self.get_bytes(&url, None).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn flight_details(&self, flight_id: &str) -> Result<FlightDetails, ProviderError> {
        let url = self.url(&format!("/flight-data/flight-details/{flight_id}"));
        let body = self.get_bytes(&url, Some(flight_id)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn source_health(&self) -> Result<Provenance, ProviderError> {
        let url = self.url("/flight-data/data-source");
        let body = self.get_bytes(&url, None).await?;
        let response: DataSourceResponse = serde_json::from_slice(&body)?;

        let source = response.source.unwrap_or_else(|| "unknown".to_owned());
        if response.using_real_data {
            Ok(Provenance::live(source))
        } else {
            Ok(Provenance::synthetic(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let provider = RestProvider::new("http://localhost:8000/");
        assert_eq!(provider.base_url(), "http://localhost:8000");
        assert_eq!(
            provider.url("/flight-data/data-source"),
            "http://localhost:8000/flight-data/data-source"
        );
    }

    #[test]
    fn test_data_source_response_defaults_label() {
        let parsed: DataSourceResponse =
            serde_json::from_str(r#"{"using_real_data": true}"#).unwrap();
        assert!(parsed.using_real_data);
        assert!(parsed.source.is_none());
    }
}
