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

//! Position feed polling.
//!
//! One poller owns the whole fetch schedule for a provider: an immediate
//! first fetch, then a fixed-interval loop. A failed fetch keeps the
//! previous snapshot and records a short user-facing error message; the
//! schedule itself never stops, so the next tick is the only retry. A
//! lower-frequency probe refreshes the provenance flag. Every request
//! carries a sequence number and a response is discarded if a newer request
//! has been issued since, so a slow response can never overwrite fresher
//! state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::model::{GeoBounds, PositionRecord, Provenance, Snapshot};
use crate::provider::{FlightDataProvider, ProviderError};

/// Configuration for the feed poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Wall-clock interval between fetches.
    pub poll_interval: Duration,
    /// Probe source health every Nth tick (1 = every tick).
    pub health_probe_every: u32,
    /// Optional bounding box passed to the provider.
    pub bounds: Option<GeoBounds>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            health_probe_every: 10,
            bounds: None,
        }
    }
}

/// Latest feed state published by the poller.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// Most recently accepted snapshot; empty before the first success.
    pub snapshot: Arc<Snapshot>,
    /// When the last successful fetch was accepted.
    pub last_success: Option<DateTime<Utc>>,
    /// Short user-facing message from the most recent failed fetch,
    /// cleared on the next success.
    pub last_error: Option<String>,
    /// Latest probed provenance (may be fresher than the snapshot's).
    pub provenance: Provenance,
    /// Sequence number of the most recently accepted response.
    pub seq: u64,
}

impl FeedState {
    fn initial() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::empty()),
            last_success: None,
            last_error: None,
            provenance: Provenance::default(),
            seq: 0,
        }
    }

    /// Whether at least one fetch has succeeded.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.last_success.is_some()
    }
}

enum PollEvent {
    Fetch(u64, Result<Vec<PositionRecord>, ProviderError>),
    Health(Result<Provenance, ProviderError>),
}

/// Handle to a background position feed poller.
///
/// Dropping the handle cancels the polling task; in-flight requests are
/// abandoned and their late results ignored.
#[derive(Debug)]
pub struct FeedPoller {
    state_rx: watch::Receiver<FeedState>,
    cancel_token: CancellationToken,
}

impl FeedPoller {
    /// Spawn the polling task. The first fetch is issued immediately.
    #[must_use]
    pub fn spawn(provider: Arc<dyn FlightDataProvider>, config: PollerConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(FeedState::initial());
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        tokio::spawn(async move {
            poll_loop(provider, config, state_tx, task_cancel).await;
        });

        Self {
            state_rx,
            cancel_token,
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Get a copy of the current feed state.
    #[must_use]
    pub fn state(&self) -> FeedState {
        self.state_rx.borrow().clone()
    }

    /// Stop polling.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for FeedPoller {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn poll_loop(
    provider: Arc<dyn FlightDataProvider>,
    config: PollerConfig,
    state_tx: watch::Sender<FeedState>,
    cancel_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let probe_every = u64::from(config.health_probe_every.max(1));
    let (event_tx, mut event_rx) = mpsc::channel::<PollEvent>(16);

    let mut tick: u64 = 0;
    let mut newest_seq: u64 = 0;
    let mut provenance = Provenance::default();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                newest_seq += 1;
                spawn_fetch(&provider, config.bounds, newest_seq, &event_tx);

                if tick % probe_every == 0 {
                    spawn_probe(&provider, &event_tx);
                }
                tick += 1;
            }

            Some(event) = event_rx.recv() => {
                match event {
                    PollEvent::Fetch(seq, result) => {
                        // A newer request has been issued; this response is stale.
                        if seq != newest_seq {
                            debug!("Discarding stale response {seq} (newest request is {newest_seq})");
                            continue;
                        }
                        apply_fetch(&state_tx, seq, result, &provenance);
                    }
                    PollEvent::Health(Ok(probed)) => {
                        if probed != provenance {
                            info!(
                                "Data source changed: {} ({})",
                                if probed.is_live() { "live" } else { "synthetic" },
                                probed.source
                            );
                        }
                        provenance = probed.clone();
                        state_tx.send_modify(|state| state.provenance = probed);
                    }
                    PollEvent::Health(Err(e)) => {
                        // Health is advisory; never touches snapshot or error state.
                        debug!("Source health probe failed: {e}");
                    }
                }
            }

            () = cancel_token.cancelled() => {
                info!("Feed poller cancelled");
                return;
            }
        }
    }
}

fn spawn_fetch(
    provider: &Arc<dyn FlightDataProvider>,
    bounds: Option<GeoBounds>,
    seq: u64,
    event_tx: &mpsc::Sender<PollEvent>,
) {
    let provider = Arc::clone(provider);
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        let result = provider.live_flights(bounds).await;
        let _ = event_tx.send(PollEvent::Fetch(seq, result)).await;
    });
}

fn spawn_probe(provider: &Arc<dyn FlightDataProvider>, event_tx: &mpsc::Sender<PollEvent>) {
    let provider = Arc::clone(provider);
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        let result = provider.source_health().await;
        let _ = event_tx.send(PollEvent::Health(result)).await;
    });
}

fn apply_fetch(
    state_tx: &watch::Sender<FeedState>,
    seq: u64,
    result: Result<Vec<PositionRecord>, ProviderError>,
    provenance: &Provenance,
) {
    match result {
        Ok(records) => {
            debug!("Accepted snapshot {seq} with {} records", records.len());
            state_tx.send_modify(|state| {
                state.snapshot = Arc::new(Snapshot::new(records, provenance.clone()));
                state.last_success = Some(Utc::now());
                state.last_error = None;
                state.seq = seq;
            });
        }
        Err(e) => {
            warn!("Fetch {seq} failed: {e}");
            // Previous snapshot stays on display; only the indicator changes.
            state_tx.send_modify(|state| {
                state.last_error = Some(e.user_message());
                state.seq = seq;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlightDetails, FlightStatus};
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn record(flight_id: &str) -> PositionRecord {
        PositionRecord {
            flight_id: flight_id.to_owned(),
            callsign: flight_id.to_owned(),
            registration: "N100AB".to_owned(),
            aircraft_type: "B738".to_owned(),
            airline: "Test Air".to_owned(),
            origin: "JFK".to_owned(),
            destination: "LAX".to_owned(),
            status: FlightStatus::EnRoute,
            latitude: 40.0,
            longitude: -100.0,
            altitude: 35000,
            speed: 450,
            heading: 270.0,
            last_updated: Utc::now(),
        }
    }

    type FetchResult = Result<Vec<PositionRecord>, ProviderError>;

    /// Provider that plays back a scripted sequence of fetch results, then
    /// keeps returning the fallback.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<FetchResult>>,
        fallback: fn() -> FetchResult,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<FetchResult>, fallback: fn() -> FetchResult) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                fallback,
            }
        }
    }

    #[async_trait]
    impl FlightDataProvider for ScriptedProvider {
        async fn live_flights(
            &self,
            _bounds: Option<GeoBounds>,
        ) -> Result<Vec<PositionRecord>, ProviderError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| (self.fallback)())
        }

        async fn flight_details(&self, flight_id: &str) -> Result<FlightDetails, ProviderError> {
            Err(ProviderError::NotFound {
                flight_id: flight_id.to_owned(),
            })
        }

        async fn source_health(&self) -> Result<Provenance, ProviderError> {
            Ok(Provenance::live("scripted"))
        }
    }

    fn fast_config() -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(25),
            health_probe_every: 1,
            bounds: None,
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<FeedState>,
        mut predicate: impl FnMut(&FeedState) -> bool,
    ) -> FeedState {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let state = rx.borrow();
                    if predicate(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.expect("poller task gone");
            }
        })
        .await
        .expect("timed out waiting for feed state")
    }

    #[tokio::test]
    async fn test_first_fetch_is_immediate() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new(), || {
            Ok(vec![record("AAL1")])
        }));
        let poller = FeedPoller::spawn(provider, fast_config());

        let mut rx = poller.subscribe();
        let state = wait_for(&mut rx, FeedState::has_data).await;
        assert_eq!(state.snapshot.len(), 1);
        assert_eq!(state.snapshot.records[0].flight_id, "AAL1");
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot_and_sets_error() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Ok(vec![record("AAL1"), record("UAL2")])],
            || Err(ProviderError::Status { code: 503 }),
        ));
        let poller = FeedPoller::spawn(provider, fast_config());

        let mut rx = poller.subscribe();
        let ok_state = wait_for(&mut rx, FeedState::has_data).await;
        assert_eq!(ok_state.snapshot.len(), 2);

        let err_state = wait_for(&mut rx, |s| s.last_error.is_some()).await;
        // Previous data intact, error surfaced.
        assert_eq!(err_state.snapshot.len(), 2);
        assert_eq!(err_state.snapshot.records[0].flight_id, "AAL1");
        assert!(err_state.seq > ok_state.seq);

        // The schedule is not halted by failures: sequence keeps advancing.
        let later = wait_for(&mut rx, |s| s.seq > err_state.seq).await;
        assert_eq!(later.snapshot.len(), 2);
        assert_eq!(later.last_success, err_state.last_success);
    }

    #[tokio::test]
    async fn test_health_probe_updates_provenance() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new(), || Ok(Vec::new())));
        let poller = FeedPoller::spawn(provider, fast_config());

        let mut rx = poller.subscribe();
        let state = wait_for(&mut rx, |s| s.provenance.is_live()).await;
        assert_eq!(state.provenance.source, "scripted");
    }

    #[tokio::test]
    async fn test_shutdown_stops_publishing() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new(), || Ok(Vec::new())));
        let poller = FeedPoller::spawn(provider, fast_config());

        let mut rx = poller.subscribe();
        wait_for(&mut rx, FeedState::has_data).await;

        poller.shutdown();
        // Once the task exits the sender side is dropped and changed() errors.
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await
        .expect("poller did not stop");
    }
}
