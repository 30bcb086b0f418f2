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

//! Core data model for flight-position feeds.
//!
//! Records are immutable once received: every poll produces a wholly new
//! [`Snapshot`] rather than patching the previous one, so consumers never
//! observe partially updated state.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Flight status as reported by position feeds.
///
/// The wire form is SCREAMING_SNAKE (`EN_ROUTE`, `SCHEDULED`, ...). Parsing
/// is case-insensitive; a status string this library does not know is kept
/// verbatim in [`FlightStatus::Other`] so one odd record never poisons a
/// whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightStatus {
    EnRoute,
    Scheduled,
    Landed,
    Departed,
    Diverted,
    Cancelled,
    Delayed,
    Maintenance,
    /// Unrecognized status, preserved as received.
    Other(String),
}

impl FlightStatus {
    /// Wire representation of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::EnRoute => "EN_ROUTE",
            Self::Scheduled => "SCHEDULED",
            Self::Landed => "LANDED",
            Self::Departed => "DEPARTED",
            Self::Diverted => "DIVERTED",
            Self::Cancelled => "CANCELLED",
            Self::Delayed => "DELAYED",
            Self::Maintenance => "MAINTENANCE",
            Self::Other(s) => s,
        }
    }

    /// Parse a feed status string, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "EN_ROUTE" => Self::EnRoute,
            "SCHEDULED" => Self::Scheduled,
            "LANDED" => Self::Landed,
            "DEPARTED" => Self::Departed,
            "DIVERTED" => Self::Diverted,
            "CANCELLED" => Self::Cancelled,
            "DELAYED" => Self::Delayed,
            "MAINTENANCE" => Self::Maintenance,
            _ => Self::Other(value.trim().to_owned()),
        }
    }

    /// Whether the aircraft is currently airborne.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        matches!(self, Self::EnRoute | Self::Departed | Self::Diverted)
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FlightStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlightStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// A single flight position as reported by one poll cycle.
///
/// Fields are never mutated after receipt; the next poll replaces the whole
/// record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Feed-assigned flight identifier.
    pub flight_id: String,
    /// Callsign / flight number (e.g. `AAL1234`).
    pub callsign: String,
    /// Registration (tail number).
    #[serde(rename = "tail_number", alias = "registration")]
    pub registration: String,
    /// ICAO aircraft type designator (e.g. `B738`).
    pub aircraft_type: String,
    /// Operating airline name.
    pub airline: String,
    /// Origin airport code.
    pub origin: String,
    /// Destination airport code.
    pub destination: String,
    pub status: FlightStatus,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in feet.
    pub altitude: i32,
    /// Ground speed in knots.
    pub speed: i32,
    /// Heading in degrees (0-360, north = 0).
    pub heading: f64,
    /// When the feed last updated this record.
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

/// Where displayed data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    /// A live external source.
    Live,
    /// Synthetically generated data.
    Synthetic,
}

/// Provenance of a snapshot: live-vs-synthetic plus the source label
/// reported by the feed's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub origin: DataOrigin,
    /// Source label (e.g. `"flightradar24"` or `"mock"`).
    pub source: String,
}

impl Provenance {
    #[must_use]
    pub fn live(source: impl Into<String>) -> Self {
        Self {
            origin: DataOrigin::Live,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn synthetic(source: impl Into<String>) -> Self {
        Self {
            origin: DataOrigin::Synthetic,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.origin == DataOrigin::Live
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::synthetic("mock")
    }
}

/// The complete set of position records retrieved by one poll cycle.
///
/// Created by a poll tick, superseded by the next, never persisted.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Records in feed order.
    pub records: Vec<PositionRecord>,
    pub provenance: Provenance,
    /// When this snapshot was captured.
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn new(records: Vec<PositionRecord>, provenance: Provenance) -> Self {
        Self {
            records,
            provenance,
            captured_at: Utc::now(),
        }
    }

    /// An empty snapshot, used before the first successful poll.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Provenance::default())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Extended record returned by the flight-details endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDetails {
    #[serde(flatten)]
    pub position: PositionRecord,
    #[serde(default)]
    pub origin_name: Option<String>,
    #[serde(default)]
    pub origin_city: Option<String>,
    #[serde(default)]
    pub destination_name: Option<String>,
    #[serde(default)]
    pub destination_city: Option<String>,
    /// Great-circle distance between origin and destination in kilometers.
    #[serde(rename = "distance", default)]
    pub distance_km: Option<i64>,
    /// Formatted enroute time, e.g. `"7h 25m"`.
    #[serde(default)]
    pub estimated_time_enroute: Option<String>,
}

/// Geographic bounding box used to scope a live-flights request.
///
/// Corner ordering never matters; the constructor normalizes to min/max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    #[must_use]
    pub fn new(lat1: f64, lat2: f64, lon1: f64, lon2: f64) -> Self {
        Self {
            min_lat: lat1.min(lat2),
            max_lat: lat1.max(lat2),
            min_lon: lon1.min(lon2),
            max_lon: lon1.max(lon2),
        }
    }

    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Query-parameter form: `lat1,lat2,lon1,lon2`.
    #[must_use]
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
