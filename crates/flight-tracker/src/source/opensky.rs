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

//! OpenSky Network REST source.
//!
//! `states/all` returns a JSON object whose `states` member is an array of
//! positional state vectors:
//! ```text
//! [icao24, callsign, origin_country, time_position, last_contact,
//!  longitude, latitude, baro_altitude, on_ground, velocity, true_track, ...]
//! ```
//! `tracks/all` returns a `path` array of
//! `[time, latitude, longitude, baro_altitude, true_track, on_ground]`.

use async_trait::async_trait;
use chrono::DateTime;
use log::debug;
use serde_json::Value;

use super::{
    normalize_callsign, FetchError, FlightSnapshot, FlightSource, FlightState, ParseError,
};

/// Public endpoint for all current state vectors.
pub const DEFAULT_STATES_URL: &str = "https://opensky-network.org/api/states/all";

/// Public endpoint for a single aircraft's track.
pub const DEFAULT_TRACKS_URL: &str = "https://opensky-network.org/api/tracks/all";

// State vector indices
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;

// Track waypoint indices
const IDX_PATH_LATITUDE: usize = 1;
const IDX_PATH_LONGITUDE: usize = 2;

/// Flight source backed by the OpenSky Network REST API.
#[derive(Debug, Clone)]
pub struct OpenSkySource {
    client: reqwest::Client,
    states_url: String,
    tracks_url: String,
}

impl OpenSkySource {
    /// Create a source for the given endpoints.
    #[must_use]
    pub fn new(states_url: impl Into<String>, tracks_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            states_url: states_url.into(),
            tracks_url: tracks_url.into(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

impl Default for OpenSkySource {
    fn default() -> Self {
        Self::new(DEFAULT_STATES_URL, DEFAULT_TRACKS_URL)
    }
}

#[async_trait]
impl FlightSource for OpenSkySource {
    async fn try_fetch_snapshot(&self) -> Result<FlightSnapshot, FetchError> {
        let body = self.get_json(&self.states_url).await?;
        Ok(parse_states(&body)?)
    }

    async fn try_fetch_trail(&self, id: &str) -> Result<Vec<(f64, f64)>, FetchError> {
        let url = format!("{}?icao24={}&time=0", self.tracks_url, id.to_lowercase());
        let body = self.get_json(&url).await?;
        Ok(parse_track(&body)?)
    }
}

/// Parse a `states/all` response body into a snapshot.
///
/// Vectors without an id or a position are skipped, as are vectors with
/// malformed fields.
pub fn parse_states(body: &Value) -> Result<FlightSnapshot, ParseError> {
    let object = body
        .as_object()
        .ok_or_else(|| ParseError::InvalidFormat("expected a JSON object".to_string()))?;

    let time = object
        .get("time")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    let rows = match object.get("states") {
        None | Some(Value::Null) => return Ok(FlightSnapshot::new(time, Vec::new())),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(ParseError::InvalidValue {
                field: "states",
                value: other.to_string(),
            })
        }
    };

    let mut states = Vec::with_capacity(rows.len());
    for row in rows {
        match parse_state_vector(row) {
            Ok(Some(state)) => states.push(state),
            Ok(None) => {}
            Err(e) => debug!("Skipping state vector: {}", e),
        }
    }

    Ok(FlightSnapshot::new(time, states))
}

/// Parse a single state vector.
fn parse_state_vector(row: &Value) -> Result<Option<FlightState>, ParseError> {
    let fields = row
        .as_array()
        .ok_or_else(|| ParseError::InvalidFormat("state vector is not an array".to_string()))?;

    let Some(id) = optional_str(fields, IDX_ICAO24, "icao24")?.map(str::trim) else {
        return Ok(None);
    };
    if id.is_empty() {
        return Ok(None);
    }

    let lat = optional_f64(fields, IDX_LATITUDE, "latitude")?;
    let lon = optional_f64(fields, IDX_LONGITUDE, "longitude")?;
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Ok(None);
    };

    Ok(Some(FlightState {
        id: id.to_string(),
        callsign: optional_str(fields, IDX_CALLSIGN, "callsign")?.and_then(normalize_callsign),
        lat,
        lon,
        altitude: optional_f64(fields, IDX_BARO_ALTITUDE, "baro_altitude")?,
        velocity: optional_f64(fields, IDX_VELOCITY, "velocity")?,
        origin_country: optional_str(fields, IDX_ORIGIN_COUNTRY, "origin_country")?
            .map(str::to_string),
        heading: optional_f64(fields, IDX_TRUE_TRACK, "true_track")?,
    }))
}

/// Parse a `tracks/all` response body into `(lat, lon)` pairs.
pub fn parse_track(body: &Value) -> Result<Vec<(f64, f64)>, ParseError> {
    let path = match body.get("path") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(path)) => path,
        Some(other) => {
            return Err(ParseError::InvalidValue {
                field: "path",
                value: other.to_string(),
            })
        }
    };

    let mut points = Vec::with_capacity(path.len());
    for waypoint in path {
        let Some(fields) = waypoint.as_array() else {
            continue;
        };
        let lat = optional_f64(fields, IDX_PATH_LATITUDE, "latitude")?;
        let lon = optional_f64(fields, IDX_PATH_LONGITUDE, "longitude")?;
        if let (Some(lat), Some(lon)) = (lat, lon) {
            points.push((lat, lon));
        }
    }

    Ok(points)
}

fn optional_f64(
    fields: &[Value],
    index: usize,
    field: &'static str,
) -> Result<Option<f64>, ParseError> {
    match fields.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(ParseError::InvalidValue {
            field,
            value: other.to_string(),
        }),
    }
}

fn optional_str<'a>(
    fields: &'a [Value],
    index: usize,
    field: &'static str,
) -> Result<Option<&'a str>, ParseError> {
    match fields.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ParseError::InvalidValue {
            field,
            value: other.to_string(),
        }),
    }
}
