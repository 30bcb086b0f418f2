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

//! Snapshot filtering.
//!
//! Filtering is a pure function from (snapshot, predicate set) to a filtered
//! record list. The filtered view is always recomputed in full, never
//! incrementally patched, so it can never drift out of sync with the
//! snapshot it was derived from.

use serde::{Deserialize, Serialize};

use crate::model::{PositionRecord, Snapshot};

/// Set of filter predicates applied to a snapshot.
///
/// Each field is independent; an empty string disables that predicate.
/// Active predicates are combined with logical AND. Text predicates match
/// case-insensitive substrings; `status` is a case-insensitive exact match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Registration (tail number) substring.
    pub registration: String,
    /// Aircraft type substring.
    pub aircraft_type: String,
    /// Airline name substring.
    pub airline: String,
    /// Exact status match (wire form, e.g. `DELAYED`).
    pub status: String,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl FilterCriteria {
    /// Criteria matching only the given registration.
    #[must_use]
    pub fn for_registration(registration: impl Into<String>) -> Self {
        Self {
            registration: registration.into(),
            ..Self::default()
        }
    }

    /// True when every predicate is disabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registration.is_empty()
            && self.aircraft_type.is_empty()
            && self.airline.is_empty()
            && self.status.is_empty()
    }

    /// Whether a single record passes every active predicate.
    #[must_use]
    pub fn matches(&self, record: &PositionRecord) -> bool {
        if !self.registration.is_empty()
            && !contains_ignore_case(&record.registration, &self.registration)
        {
            return false;
        }
        if !self.aircraft_type.is_empty()
            && !contains_ignore_case(&record.aircraft_type, &self.aircraft_type)
        {
            return false;
        }
        if !self.airline.is_empty() && !contains_ignore_case(&record.airline, &self.airline) {
            return false;
        }
        if !self.status.is_empty()
            && !record.status.as_str().eq_ignore_ascii_case(&self.status)
        {
            return false;
        }
        true
    }

    /// Derive the filtered view of a snapshot, preserving record order.
    #[must_use]
    pub fn apply(&self, snapshot: &Snapshot) -> Vec<PositionRecord> {
        snapshot
            .records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlightStatus, Provenance};

    fn record(registration: &str, status: &str) -> PositionRecord {
        PositionRecord {
            flight_id: format!("F-{registration}"),
            callsign: "TST100".to_owned(),
            registration: registration.to_owned(),
            aircraft_type: "B738".to_owned(),
            airline: "Test Air".to_owned(),
            origin: "JFK".to_owned(),
            destination: "LAX".to_owned(),
            status: FlightStatus::parse(status),
            latitude: 0.0,
            longitude: 0.0,
            altitude: 30000,
            speed: 420,
            heading: 90.0,
            last_updated: chrono::Utc::now(),
        }
    }

    fn snapshot(records: Vec<PositionRecord>) -> Snapshot {
        Snapshot::new(records, Provenance::synthetic("test"))
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let snap = snapshot(vec![record("HK-1", "EN_ROUTE"), record("HK-2", "LANDED")]);
        let filtered = FilterCriteria::default().apply(&snap);
        assert_eq!(filtered, snap.records);
    }

    #[test]
    fn test_registration_substring_case_insensitive() {
        let snap = snapshot(vec![record("HK-1", "EN_ROUTE"), record("HK-2", "EN_ROUTE")]);
        let criteria = FilterCriteria::for_registration("hk-1");
        let filtered = criteria.apply(&snap);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].registration, "HK-1");
    }

    #[test]
    fn test_status_exact_match_case_insensitive() {
        let snap = snapshot(vec![
            record("A", "delayed"),
            record("B", "Delayed"),
            record("C", "EN_ROUTE"),
        ]);
        let criteria = FilterCriteria {
            status: "DELAYED".to_owned(),
            ..FilterCriteria::default()
        };
        let filtered = criteria.apply(&snap);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.status == FlightStatus::Delayed));
    }

    #[test]
    fn test_status_is_not_substring_match() {
        let snap = snapshot(vec![record("A", "EN_ROUTE")]);
        let criteria = FilterCriteria {
            status: "EN".to_owned(),
            ..FilterCriteria::default()
        };
        assert!(criteria.apply(&snap).is_empty());
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let mut matching = record("HK-5020", "EN_ROUTE");
        matching.airline = "Colcharter".to_owned();
        let mut wrong_airline = record("HK-5020", "EN_ROUTE");
        wrong_airline.flight_id = "F-other".to_owned();
        wrong_airline.airline = "Test Air".to_owned();

        let snap = snapshot(vec![matching.clone(), wrong_airline]);
        let criteria = FilterCriteria {
            registration: "hk-50".to_owned(),
            airline: "colchar".to_owned(),
            ..FilterCriteria::default()
        };
        assert_eq!(criteria.apply(&snap), vec![matching]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let snap = snapshot(vec![
            record("HK-1", "EN_ROUTE"),
            record("HK-2", "DELAYED"),
            record("HK-10", "EN_ROUTE"),
        ]);
        let criteria = FilterCriteria::for_registration("HK-1");

        let once = criteria.apply(&snap);
        let twice = criteria.apply(&snapshot(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clearing_filters_restores_full_snapshot() {
        let snap = snapshot(vec![record("HK-1", "EN_ROUTE"), record("HK-2", "DELAYED")]);
        let mut criteria = FilterCriteria {
            registration: "HK-1".to_owned(),
            status: "EN_ROUTE".to_owned(),
            ..FilterCriteria::default()
        };
        assert_eq!(criteria.apply(&snap).len(), 1);

        criteria.registration.clear();
        criteria.status.clear();
        assert!(criteria.is_empty());
        assert_eq!(criteria.apply(&snap), snap.records);
    }
}
