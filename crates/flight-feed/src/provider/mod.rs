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

//! Flight data providers.
//!
//! A trait-based abstraction over where position records come from, so the
//! synthetic generator and the live REST feed are interchangeable: consumers
//! depend on [`FlightDataProvider`] and never on a concrete source.

mod mock;
mod rest;

pub use mock::{Airport, MockConfig, MockProvider};
pub use rest::RestProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{FlightDetails, GeoBounds, PositionRecord, Provenance};

/// Errors produced by a flight data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no flight found for id '{flight_id}'")]
    NotFound { flight_id: String },

    #[error("unexpected response status {code}")]
    Status { code: u16 },
}

impl ProviderError {
    /// Short user-facing message; detail stays in the log.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::Malformed(_) | Self::Status { .. } => {
                "Failed to fetch flight data. Please try again later.".to_owned()
            }
            Self::NotFound { flight_id } => format!("Flight '{flight_id}' was not found."),
        }
    }
}

/// Source of live flight positions, flight details, and source health.
#[async_trait]
pub trait FlightDataProvider: Send + Sync {
    /// Fetch the current set of flight positions, optionally scoped to a
    /// bounding box. Each call returns a wholly new record collection.
    async fn live_flights(
        &self,
        bounds: Option<GeoBounds>,
    ) -> Result<Vec<PositionRecord>, ProviderError>;

    /// Fetch the extended record for a single flight.
    async fn flight_details(&self, flight_id: &str) -> Result<FlightDetails, ProviderError>;

    /// Probe the backing source and report data provenance.
    async fn source_health(&self) -> Result<Provenance, ProviderError>;
}
