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

//! Flight-position feed client library.
//!
//! This library provides a modular, reusable pipeline for polling and
//! filtering live flight-position feeds. It is organized as layers that can
//! be used independently or composed together:
//!
//! - **Model layer**: immutable position records, snapshots, provenance
//! - **Provider layer**: interchangeable data sources (REST feed, synthetic
//!   generator) behind one trait
//! - **Poller layer**: background fetch schedule with fetch-health tracking
//!   and stale-response suppression
//! - **Filter layer**: pure predicate evaluation over snapshots
//! - **Watchlist**: persisted list of tracked aircraft
//!
//! # Quick Start
//!
//! Use the [`FeedClient`] type for full-stack operation:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use flight_feed::{ClientConfig, FeedClient, MockConfig, MockProvider, PollerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = Arc::new(MockProvider::new(&MockConfig::default()));
//!     let client = FeedClient::spawn(provider, ClientConfig {
//!         poller: PollerConfig {
//!             poll_interval: Duration::from_secs(30),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     });
//!
//!     let mut updates = client.subscribe();
//!     while updates.changed().await.is_ok() {
//!         for flight in client.filtered_flights() {
//!             println!("{}: {}", flight.callsign, flight.status);
//!         }
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! The filter evaluator is a pure function and can be used on its own:
//!
//! ```
//! use flight_feed::{FilterCriteria, Snapshot, Provenance};
//!
//! let snapshot = Snapshot::new(Vec::new(), Provenance::synthetic("mock"));
//! let criteria = FilterCriteria::for_registration("HK-5020");
//! assert!(criteria.apply(&snapshot).is_empty());
//! ```

pub mod aggregator;
pub mod filter;
pub mod model;
pub mod poller;
pub mod provider;
pub mod watchlist;

use std::sync::{Arc, RwLock};

use tokio::sync::watch;

pub use aggregator::{AggregatorClient, AggregatorError, AggregatorFlightDetails};
pub use filter::FilterCriteria;
pub use model::{
    DataOrigin, FlightDetails, FlightStatus, GeoBounds, PositionRecord, Provenance, Snapshot,
};
pub use poller::{FeedPoller, FeedState, PollerConfig};
pub use provider::{
    Airport, FlightDataProvider, MockConfig, MockProvider, ProviderError, RestProvider,
};
pub use watchlist::{WatchedAircraft, Watchlist, WatchlistError};

/// Configuration for the full-stack client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Poller configuration.
    pub poller: PollerConfig,
    /// Initial filter predicates.
    pub filters: FilterCriteria,
}

/// Full-stack feed client that wires the layers together.
///
/// Owns a background [`FeedPoller`] and the current predicate set; the
/// filtered view is recomputed from the latest snapshot on every call, so it
/// can never go stale.
#[derive(Debug)]
pub struct FeedClient {
    poller: FeedPoller,
    filters: RwLock<FilterCriteria>,
}

impl FeedClient {
    /// Spawn a client over the given provider.
    #[must_use]
    pub fn spawn(provider: Arc<dyn FlightDataProvider>, config: ClientConfig) -> Self {
        Self {
            poller: FeedPoller::spawn(provider, config.poller),
            filters: RwLock::new(config.filters),
        }
    }

    /// Get a copy of the current feed state.
    #[must_use]
    pub fn state(&self) -> FeedState {
        self.poller.state()
    }

    /// Subscribe to feed state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.poller.subscribe()
    }

    /// The filtered view of the latest snapshot, in snapshot order.
    #[must_use]
    pub fn filtered_flights(&self) -> Vec<PositionRecord> {
        let state = self.poller.state();
        self.filters
            .read()
            .map(|filters| filters.apply(&state.snapshot))
            .unwrap_or_default()
    }

    /// Get the current filter predicates.
    #[must_use]
    pub fn filters(&self) -> FilterCriteria {
        self.filters
            .read()
            .map(|filters| filters.clone())
            .unwrap_or_default()
    }

    /// Replace the filter predicates.
    pub fn set_filters(&self, criteria: FilterCriteria) {
        if let Ok(mut filters) = self.filters.write() {
            *filters = criteria;
        }
    }

    /// Focus the view on one aircraft by setting the registration predicate.
    pub fn track(&self, registration: &str) {
        if let Ok(mut filters) = self.filters.write() {
            filters.registration = registration.to_owned();
        }
    }

    /// Stop the background poller.
    pub fn shutdown(&self) {
        self.poller.shutdown();
    }
}
