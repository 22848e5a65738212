// Copyright 2025 Chris Custine
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

//! Source layer for flight-state feeds.
//!
//! This module defines the snapshot model shared by every feed, plus the
//! trait-based seams the poller fetches through. The OpenSky REST API is the
//! bundled implementation; image lookups come from planespotters.net.
//!
//! Every fetch has two forms: a fallible `try_*` method that implementations
//! provide, and an infallible provided method that logs the failure and
//! substitutes an empty result. The reconciler only ever sees the latter.

mod opensky;
mod photos;

pub use opensky::{OpenSkySource, DEFAULT_STATES_URL, DEFAULT_TRACKS_URL};
pub use photos::PlanespottersImages;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while decoding a feed payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid payload format: {0}")]
    InvalidFormat(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Errors that can occur while fetching from a remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    Malformed(#[from] ParseError),
}

/// One aircraft's reported state within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    /// ICAO 24-bit transponder address (hex string).
    pub id: String,
    /// Trimmed callsign, absent when blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Barometric altitude in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Ground speed in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    /// Country of registration as reported by the feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
    /// True track in degrees (0-360, north = 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl FlightState {
    /// Create a state with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            callsign: None,
            lat,
            lon,
            altitude: None,
            velocity: None,
            origin_country: None,
            heading: None,
        }
    }

    /// Set the callsign, trimming whitespace and dropping blanks.
    #[must_use]
    pub fn with_callsign(mut self, callsign: &str) -> Self {
        self.callsign = normalize_callsign(callsign);
        self
    }

    /// Label used in lists and notices: the callsign, or the id when unknown.
    #[must_use]
    pub fn label(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.id)
    }

    /// Whether `needle` (already lowercased) occurs in the callsign or id.
    fn matches(&self, needle: &str) -> bool {
        self.callsign
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
            || self.id.to_lowercase().contains(needle)
    }
}

pub(crate) fn normalize_callsign(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One poll's worth of aircraft positions.
///
/// Ids are unique and every record has a position; both are enforced when the
/// snapshot is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightSnapshot {
    time: Option<DateTime<Utc>>,
    flights: Vec<FlightState>,
}

impl FlightSnapshot {
    /// Build a snapshot, keeping the first record for any repeated id.
    #[must_use]
    pub fn new(time: Option<DateTime<Utc>>, states: impl IntoIterator<Item = FlightState>) -> Self {
        let mut seen = HashSet::new();
        let mut flights = Vec::new();

        for state in states {
            if seen.contains(&state.id) {
                warn!("Dropping duplicate state for {} in snapshot", state.id);
                continue;
            }
            seen.insert(state.id.clone());
            flights.push(state);
        }

        Self { time, flights }
    }

    /// Upstream time the snapshot refers to, when the feed reports one.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    /// Records in feed order.
    #[must_use]
    pub fn flights(&self) -> &[FlightState] {
        &self.flights
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FlightState> {
        self.flights.iter().find(|f| f.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Case-insensitive substring search on callsign or id.
    ///
    /// Returns the first match in feed order. A blank query matches nothing.
    #[must_use]
    pub fn find_by_query(&self, query: &str) -> Option<&FlightState> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.flights.iter().find(|f| f.matches(&needle))
    }
}

/// A feed of flight states and per-flight trails.
#[async_trait]
pub trait FlightSource: Send + Sync {
    /// Fetch the current set of flight states.
    async fn try_fetch_snapshot(&self) -> Result<FlightSnapshot, FetchError>;

    /// Fetch the historical path of one flight as `(lat, lon)` pairs.
    async fn try_fetch_trail(&self, id: &str) -> Result<Vec<(f64, f64)>, FetchError>;

    /// Fetch the current snapshot, substituting an empty one on failure.
    async fn fetch_snapshot(&self) -> FlightSnapshot {
        match self.try_fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Error fetching flights: {}", e);
                FlightSnapshot::default()
            }
        }
    }

    /// Fetch a trail, substituting an empty path on failure.
    async fn fetch_trail(&self, id: &str) -> Vec<(f64, f64)> {
        match self.try_fetch_trail(id).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Error fetching trail for {}: {}", id, e);
                Vec::new()
            }
        }
    }
}

/// Cosmetic image lookup for a flight.
#[async_trait]
pub trait ImageLookup: Send + Sync {
    /// Look up an image URL, `Ok(None)` when the source has no image.
    async fn try_fetch_image(&self, id: &str) -> Result<Option<String>, FetchError>;

    /// Look up an image URL, treating failures as "no image".
    async fn fetch_image(&self, id: &str) -> Option<String> {
        match self.try_fetch_image(id).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to fetch photo for {}: {}", id, e);
                None
            }
        }
    }
}
