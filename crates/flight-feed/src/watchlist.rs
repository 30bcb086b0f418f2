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

//! Persisted fleet watchlist.
//!
//! A user-curated list of tracked aircraft, stored as one JSON document:
//! read at startup, rewritten on every mutation. There is no schema
//! versioning. Validation happens before any write, so an invalid add never
//! touches the file.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One tracked aircraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedAircraft {
    /// Registration (tail number), unique within the list.
    pub registration: String,
    /// Free-form aircraft type description.
    #[serde(rename = "type")]
    pub aircraft_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WatchedAircraft {
    #[must_use]
    pub fn new(registration: impl Into<String>, aircraft_type: impl Into<String>) -> Self {
        Self {
            registration: registration.into(),
            aircraft_type: aircraft_type.into(),
            notes: None,
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Errors from watchlist operations.
#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("registration and aircraft type are required")]
    MissingField,

    #[error("an aircraft with registration '{0}' is already saved")]
    Duplicate(String),

    #[error("failed to access watchlist file: {0}")]
    Io(#[from] std::io::Error),

    #[error("watchlist file is corrupt: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The charter fleet a fresh watchlist starts with.
#[must_use]
pub fn default_fleet() -> Vec<WatchedAircraft> {
    vec![
        WatchedAircraft::new("HK-5020", "Piper PA-34-200T Seneca II").with_notes("Colcharter"),
        WatchedAircraft::new("HK-2946", "Piper PA-34-220T Seneca III").with_notes("Colcharter"),
        WatchedAircraft::new("HK-4699", "Piper PA-34-220T Seneca III").with_notes("Colcharter"),
        WatchedAircraft::new("HK-4714", "Cessna 414").with_notes("Colcharter"),
        WatchedAircraft::new("HK-4966", "Rockwell 690A Turbo Commander").with_notes("Colcharter"),
        WatchedAircraft::new("HK-5225", "Swearingen SA226-AT Merlin IV").with_notes("Colcharter"),
        WatchedAircraft::new("HK-5118", "Beechcraft C90GTx King Air").with_notes("Colcharter"),
    ]
}

/// Watchlist backed by a JSON file.
#[derive(Debug)]
pub struct Watchlist {
    path: PathBuf,
    entries: Vec<WatchedAircraft>,
}

impl Watchlist {
    /// Load the watchlist, seeding a missing file with [`default_fleet`].
    ///
    /// A corrupt or unreadable file is an error; it is never silently
    /// replaced.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, WatchlistError> {
        let path = path.into();

        if !path.exists() {
            let list = Self {
                path,
                entries: default_fleet(),
            };
            list.persist()?;
            info!(
                "Seeded watchlist with {} default aircraft at {}",
                list.entries.len(),
                list.path.display()
            );
            return Ok(list);
        }

        let contents = fs::read_to_string(&path)?;
        let entries: Vec<WatchedAircraft> = serde_json::from_str(&contents)?;
        Ok(Self { path, entries })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in stored order.
    #[must_use]
    pub fn entries(&self) -> &[WatchedAircraft] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, registration: &str) -> bool {
        self.entries
            .iter()
            .any(|aircraft| aircraft.registration == registration)
    }

    /// Validate and save a new aircraft, persisting on success.
    pub fn add(&mut self, aircraft: WatchedAircraft) -> Result<(), WatchlistError> {
        if aircraft.registration.trim().is_empty() || aircraft.aircraft_type.trim().is_empty() {
            return Err(WatchlistError::MissingField);
        }
        if self.contains(&aircraft.registration) {
            return Err(WatchlistError::Duplicate(aircraft.registration));
        }

        self.entries.push(aircraft);
        self.persist()
    }

    /// Remove an aircraft by registration. Returns whether one was removed.
    pub fn remove(&mut self, registration: &str) -> Result<bool, WatchlistError> {
        let before = self.entries.len();
        self.entries
            .retain(|aircraft| aircraft.registration != registration);

        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), WatchlistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("flight-feed-watchlist-{}-{name}.json", std::process::id()))
    }

    struct Cleanup(PathBuf);
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_missing_file_is_seeded_with_default_fleet() {
        let path = temp_path("seed");
        let _cleanup = Cleanup(path.clone());
        let _ = fs::remove_file(&path);

        let list = Watchlist::load(&path).unwrap();
        assert_eq!(list.entries().len(), 7);
        assert!(list.contains("HK-5020"));
        assert!(path.exists());
    }

    #[test]
    fn test_add_validates_before_writing() {
        let path = temp_path("validate");
        let _cleanup = Cleanup(path.clone());
        let _ = fs::remove_file(&path);

        let mut list = Watchlist::load(&path).unwrap();

        let err = list.add(WatchedAircraft::new("", "Cessna 172")).unwrap_err();
        assert!(matches!(err, WatchlistError::MissingField));

        let err = list.add(WatchedAircraft::new("HK-9999", "  ")).unwrap_err();
        assert!(matches!(err, WatchlistError::MissingField));

        let err = list
            .add(WatchedAircraft::new("HK-5020", "Piper PA-34-200T Seneca II"))
            .unwrap_err();
        assert!(matches!(err, WatchlistError::Duplicate(_)));

        // Failed adds never changed the stored list.
        let reloaded = Watchlist::load(&path).unwrap();
        assert_eq!(reloaded.entries().len(), 7);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let path = temp_path("persist");
        let _cleanup = Cleanup(path.clone());
        let _ = fs::remove_file(&path);

        let mut list = Watchlist::load(&path).unwrap();
        list.add(WatchedAircraft::new("HK-1234", "Cessna 208 Caravan").with_notes("leased"))
            .unwrap();
        assert!(list.remove("HK-5225").unwrap());
        assert!(!list.remove("HK-5225").unwrap());

        let reloaded = Watchlist::load(&path).unwrap();
        assert_eq!(reloaded.entries().len(), 7);
        assert!(reloaded.contains("HK-1234"));
        assert!(!reloaded.contains("HK-5225"));
    }

    #[test]
    fn test_corrupt_file_is_an_error_not_a_reset() {
        let path = temp_path("corrupt");
        let _cleanup = Cleanup(path.clone());
        fs::write(&path, "not json at all").unwrap();

        let err = Watchlist::load(&path).unwrap_err();
        assert!(matches!(err, WatchlistError::Malformed(_)));
        // The broken file is left in place for the user to inspect.
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json at all");
    }
}
