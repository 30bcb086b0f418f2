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

//! Synthetic flight data generation.
//!
//! Generates a plausible fleet of flights between a table of major airports
//! and advances their positions over time: linear interpolation along the
//! great-circle route with a climb/cruise/descent altitude profile and a
//! little positional jitter. Used whenever no live feed is configured, and
//! by tests that need deterministic (seeded) data.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::{FlightDataProvider, ProviderError};
use crate::model::{FlightDetails, FlightStatus, GeoBounds, PositionRecord, Provenance};

const CRUISE_ALTITUDE_FT: f64 = 35_000.0;
const CLIMB_PHASE_FRACTION: f64 = 0.1;
const IRREGULAR_STATUS_RATE: f64 = 0.05;

/// Airlines used for synthetic flight numbers (ICAO code, name).
const AIRLINES: &[(&str, &str)] = &[
    ("AAL", "American Airlines"),
    ("UAL", "United Airlines"),
    ("DAL", "Delta Air Lines"),
    ("BAW", "British Airways"),
    ("AFR", "Air France"),
    ("DLH", "Lufthansa"),
    ("KLM", "KLM Royal Dutch Airlines"),
    ("IBE", "Iberia"),
    ("UAE", "Emirates"),
    ("SIA", "Singapore Airlines"),
    ("JAL", "Japan Airlines"),
    ("QFA", "Qantas"),
    ("TAM", "LATAM Brasil"),
    ("AMX", "Aeroméxico"),
];

const AIRCRAFT_TYPES: &[&str] = &[
    "B738", "B77W", "A320", "A321", "B789", "A350", "B748", "A380", "E190", "CRJ9",
];

/// A reference airport used to route synthetic flights and enrich details.
///
/// The serde renames match OurAirports CSV columns so extended tables can be
/// loaded with [`MockProvider::load_airports_csv`].
#[derive(Debug, Clone, Deserialize)]
pub struct Airport {
    #[serde(rename = "ident")]
    pub code: String,
    pub name: String,
    #[serde(rename = "municipality")]
    pub city: String,
    #[serde(rename = "latitude_deg")]
    pub latitude: f64,
    #[serde(rename = "longitude_deg")]
    pub longitude: f64,
}

fn airport(code: &str, name: &str, city: &str, latitude: f64, longitude: f64) -> Airport {
    Airport {
        code: code.to_owned(),
        name: name.to_owned(),
        city: city.to_owned(),
        latitude,
        longitude,
    }
}

lazy_static! {
    static ref BUILTIN_AIRPORTS: Vec<Airport> = vec![
        airport("JFK", "John F. Kennedy International Airport", "New York", 40.6413, -73.7781),
        airport("LAX", "Los Angeles International Airport", "Los Angeles", 33.9416, -118.4085),
        airport("ORD", "O'Hare International Airport", "Chicago", 41.9742, -87.9073),
        airport("LHR", "Heathrow Airport", "London", 51.4700, -0.4543),
        airport("CDG", "Charles de Gaulle Airport", "Paris", 49.0097, 2.5479),
        airport("FRA", "Frankfurt Airport", "Frankfurt", 50.0379, 8.5622),
        airport("AMS", "Amsterdam Airport Schiphol", "Amsterdam", 52.3105, 4.7683),
        airport("MAD", "Adolfo Suárez Madrid–Barajas Airport", "Madrid", 40.4983, -3.5676),
        airport("BCN", "Barcelona–El Prat Airport", "Barcelona", 41.2974, 2.0833),
        airport("DXB", "Dubai International Airport", "Dubai", 25.2532, 55.3657),
        airport("SIN", "Singapore Changi Airport", "Singapore", 1.3644, 103.9915),
        airport("HND", "Haneda Airport", "Tokyo", 35.5494, 139.7798),
        airport("SYD", "Sydney Airport", "Sydney", -33.9399, 151.1753),
        airport("GRU", "São Paulo–Guarulhos International Airport", "São Paulo", -23.4356, -46.4731),
        airport("MEX", "Mexico City International Airport", "Mexico City", 19.4363, -99.0721),
    ];
}

/// Calculate great-circle distance between two lat/lon points in kilometers.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let r = 6371.0; // Earth's radius in kilometers

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    r * c
}

/// Initial great-circle bearing from one point to another, in degrees 0-360.
fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Format a duration as `"{h}h {m}m"`.
fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

fn progress_between(departure: DateTime<Utc>, arrival: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let total = (arrival - departure).num_seconds() as f64;
    if total <= 0.0 {
        return 1.0;
    }
    let elapsed = (now - departure).num_seconds() as f64;
    (elapsed / total).clamp(0.0, 1.0)
}

fn status_for_progress(progress: f64) -> FlightStatus {
    if progress <= 0.0 {
        FlightStatus::Scheduled
    } else if progress < CLIMB_PHASE_FRACTION {
        FlightStatus::Departed
    } else if progress < 0.9 {
        FlightStatus::EnRoute
    } else {
        FlightStatus::Landed
    }
}

/// Altitude (ft) and speed (kt) for a point along the flight: climb to
/// cruise in the first tenth, descend in the last tenth, zero on the ground.
#[allow(clippy::cast_possible_truncation, reason = "values stay well inside i32 range")]
fn flight_profile(progress: f64) -> (i32, i32) {
    if progress <= 0.0 || progress >= 1.0 {
        return (0, 0);
    }
    let factor = if progress < CLIMB_PHASE_FRACTION {
        progress / CLIMB_PHASE_FRACTION
    } else if progress > 1.0 - CLIMB_PHASE_FRACTION {
        (1.0 - progress) / CLIMB_PHASE_FRACTION
    } else {
        1.0
    };
    ((CRUISE_ALTITUDE_FT * factor) as i32, (400.0 + 200.0 * factor) as i32)
}

fn interpolate(origin: &Airport, destination: &Airport, progress: f64) -> (f64, f64) {
    if progress <= 0.0 {
        (origin.latitude, origin.longitude)
    } else if progress >= 1.0 {
        (destination.latitude, destination.longitude)
    } else {
        (
            origin.latitude + progress * (destination.latitude - origin.latitude),
            origin.longitude + progress * (destination.longitude - origin.longitude),
        )
    }
}

/// Configuration for the synthetic provider.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of flights to generate.
    pub num_flights: usize,
    /// RNG seed for reproducible fleets.
    pub seed: Option<u64>,
    /// Positions are advanced lazily when a fetch arrives at least this long
    /// after the previous refresh.
    pub reposition_after: StdDuration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_flights: 50,
            seed: None,
            reposition_after: StdDuration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct MockFlight {
    record: PositionRecord,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
    /// Diverted/cancelled assignments stick across repositioning.
    status_pinned: bool,
}

#[derive(Debug)]
struct MockState {
    flights: Vec<MockFlight>,
    rng: StdRng,
    last_refresh: DateTime<Utc>,
}

/// Synthetic flight data provider.
///
/// Callers always receive owned, immutable records; the provider advances
/// its internal fleet lazily behind a mutex.
#[derive(Debug)]
pub struct MockProvider {
    airports: Vec<Airport>,
    reposition_after: Duration,
    state: Mutex<MockState>,
}

impl MockProvider {
    /// Create a provider over the built-in airport table.
    #[must_use]
    pub fn new(config: &MockConfig) -> Self {
        Self::with_airports(config, BUILTIN_AIRPORTS.clone())
    }

    /// Create a provider over a custom airport table (at least two entries).
    #[must_use]
    pub fn with_airports(config: &MockConfig, airports: Vec<Airport>) -> Self {
        assert!(
            airports.len() >= 2,
            "synthetic flights need at least two airports"
        );

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let now = Utc::now();
        let flights = (0..config.num_flights)
            .map(|_| generate_flight(&airports, &mut rng, now))
            .collect();

        Self {
            airports,
            reposition_after: Duration::from_std(config.reposition_after)
                .unwrap_or_else(|_| Duration::seconds(10)),
            state: Mutex::new(MockState {
                flights,
                rng,
                last_refresh: now,
            }),
        }
    }

    /// Load an OurAirports-style CSV airport table.
    ///
    /// Returns the parsed airports; callers typically append them to the
    /// built-in table before [`MockProvider::with_airports`].
    pub fn load_airports_csv(path: impl AsRef<Path>) -> Result<Vec<Airport>, csv::Error> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut airports = Vec::new();
        for result in reader.deserialize() {
            let airport: Airport = result?;
            airports.push(airport);
        }
        info!("Loaded {} airports", airports.len());
        Ok(airports)
    }

    fn find_airport(&self, code: &str) -> Option<&Airport> {
        self.airports.iter().find(|a| a.code == code)
    }
}

fn rand_letter(rng: &mut StdRng) -> char {
    char::from(b'A' + rng.gen_range(0..26))
}

fn generate_flight(airports: &[Airport], rng: &mut StdRng, now: DateTime<Utc>) -> MockFlight {
    let origin_idx = rng.gen_range(0..airports.len());
    let mut destination_idx = rng.gen_range(0..airports.len());
    while destination_idx == origin_idx {
        destination_idx = rng.gen_range(0..airports.len());
    }
    let origin = &airports[origin_idx];
    let destination = &airports[destination_idx];

    let (airline_code, airline_name) = AIRLINES[rng.gen_range(0..AIRLINES.len())];
    let flight_number = format!("{airline_code}{}", rng.gen_range(100..=9999));
    let registration = format!(
        "N{}{}{}",
        rng.gen_range(100..=999),
        rand_letter(rng),
        rand_letter(rng)
    );
    let aircraft_type = AIRCRAFT_TYPES[rng.gen_range(0..AIRCRAFT_TYPES.len())];

    let departure = now - Duration::hours(rng.gen_range(0..=5));
    let arrival = departure + Duration::hours(rng.gen_range(1..=12));
    let progress = progress_between(departure, arrival, now);

    let mut status = status_for_progress(progress);
    let mut status_pinned = false;
    if rng.gen::<f64>() < IRREGULAR_STATUS_RATE {
        status = if rng.gen::<bool>() {
            FlightStatus::Diverted
        } else {
            FlightStatus::Cancelled
        };
        status_pinned = true;
    }

    let (mut latitude, mut longitude) = interpolate(origin, destination, progress);
    if progress > 0.0 && progress < 1.0 {
        latitude += rng.gen_range(-0.5..=0.5);
        longitude += rng.gen_range(-0.5..=0.5);
    }
    let (altitude, speed) = flight_profile(progress);
    let heading = initial_bearing_deg(
        origin.latitude,
        origin.longitude,
        destination.latitude,
        destination.longitude,
    );

    MockFlight {
        record: PositionRecord {
            flight_id: flight_number.clone(),
            callsign: flight_number,
            registration,
            aircraft_type: (*aircraft_type).to_owned(),
            airline: (*airline_name).to_owned(),
            origin: origin.code.clone(),
            destination: destination.code.clone(),
            status,
            latitude,
            longitude,
            altitude,
            speed,
            heading,
            last_updated: now,
        },
        departure,
        arrival,
        status_pinned,
    }
}

/// Advance in-air flights along their routes based on elapsed time.
fn reposition(state: &mut MockState, airports: &[Airport], now: DateTime<Utc>) {
    // Split borrow: the RNG and the flight list live in the same struct.
    let MockState { flights, rng, .. } = state;

    for flight in flights.iter_mut() {
        if flight.status_pinned
            || !matches!(
                flight.record.status,
                FlightStatus::Departed | FlightStatus::EnRoute
            )
        {
            continue;
        }

        let origin = airports.iter().find(|a| a.code == flight.record.origin);
        let destination = airports.iter().find(|a| a.code == flight.record.destination);
        let (Some(origin), Some(destination)) = (origin, destination) else {
            continue;
        };

        let progress = progress_between(flight.departure, flight.arrival, now);
        flight.record.status = status_for_progress(progress);

        let (mut latitude, mut longitude) = interpolate(origin, destination, progress);
        if progress > 0.0 && progress < 1.0 {
            latitude += rng.gen_range(-0.05..=0.05);
            longitude += rng.gen_range(-0.05..=0.05);
        }
        let (altitude, speed) = flight_profile(progress);

        flight.record.latitude = latitude;
        flight.record.longitude = longitude;
        flight.record.altitude = altitude;
        flight.record.speed = speed;
        flight.record.last_updated = now;
    }
}

#[async_trait]
impl FlightDataProvider for MockProvider {
    async fn live_flights(
        &self,
        bounds: Option<GeoBounds>,
    ) -> Result<Vec<PositionRecord>, ProviderError> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let now = Utc::now();
        if now - state.last_refresh > self.reposition_after {
            reposition(&mut state, &self.airports, now);
            state.last_refresh = now;
        }

        let records = state
            .flights
            .iter()
            .map(|flight| flight.record.clone())
            .filter(|record| {
                bounds.is_none_or(|b| b.contains(record.latitude, record.longitude))
            })
            .collect();
        Ok(records)
    }

    async fn flight_details(&self, flight_id: &str) -> Result<FlightDetails, ProviderError> {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let flight = state
            .flights
            .iter()
            .find(|flight| flight.record.flight_id == flight_id)
            .ok_or_else(|| ProviderError::NotFound {
                flight_id: flight_id.to_owned(),
            })?;

        let origin = self.find_airport(&flight.record.origin);
        let destination = self.find_airport(&flight.record.destination);
        let distance_km = match (origin, destination) {
            (Some(o), Some(d)) => {
                let km = haversine_km(o.latitude, o.longitude, d.latitude, d.longitude);
                #[allow(clippy::cast_possible_truncation, reason = "distances fit in i64")]
                let km = km as i64;
                Some(km)
            }
            _ => None,
        };

        Ok(FlightDetails {
            position: flight.record.clone(),
            origin_name: origin.map(|a| a.name.clone()),
            origin_city: origin.map(|a| a.city.clone()),
            destination_name: destination.map(|a| a.name.clone()),
            destination_city: destination.map(|a| a.city.clone()),
            distance_km,
            estimated_time_enroute: Some(format_duration(flight.arrival - flight.departure)),
        })
    }

    async fn source_health(&self) -> Result<Provenance, ProviderError> {
        Ok(Provenance::synthetic("mock"))
    }
}
