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

//! Flight-state reconciliation.
//!
//! [`reconcile`] turns a snapshot plus the previous [`DisplayState`] into the
//! minimal list of [`Mutation`]s for the renderer. It performs no I/O and
//! never fails. [`Reconciler`] owns the display state between polls and
//! implements the user-facing operations (follow, select, bookmark, search)
//! on top of it.

mod commands;

pub use commands::{Command, Effect, Response};

use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroU32;

use log::{debug, info};
use thiserror::Error;

use crate::region::RegionFilter;
use crate::render::Mutation;
use crate::source::{FlightSnapshot, FlightState};

/// Saved flights keyed by id.
pub type Bookmarks = BTreeMap<String, FlightState>;

/// Errors from user-initiated operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("flight '{0}' not found in the latest snapshot")]
    NotFound(String),
}

/// Reconciler bookkeeping for one rendered marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Last position sent to the renderer.
    pub lat: f64,
    pub lon: f64,
    /// Consecutive filtered snapshots this id was absent from.
    pub missed_polls: u32,
}

impl Marker {
    fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            missed_polls: 0,
        }
    }
}

/// State that persists across polls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    /// Flights with a marker on the map.
    pub markers: BTreeMap<String, Marker>,
    /// Flight the view follows, if any.
    pub followed_id: Option<String>,
    /// User-saved flights; never touched by reconciliation.
    pub bookmarks: Bookmarks,
}

/// Policy for removing markers of flights that stopped appearing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Eviction {
    /// Markers stay on the map forever.
    #[default]
    Never,
    /// Remove a marker once its flight is missing from this many consecutive
    /// filtered snapshots.
    AfterMissedPolls(NonZeroU32),
}

impl Eviction {
    /// Build from an optional poll count; `None` or zero disables eviction.
    #[must_use]
    pub fn from_polls(polls: Option<u32>) -> Self {
        polls
            .and_then(NonZeroU32::new)
            .map_or(Self::Never, Self::AfterMissedPolls)
    }
}

/// Result of reconciling one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Creates and moves in snapshot order, then removals, then any pan.
    pub mutations: Vec<Mutation>,
    /// Number of flights passing the filter.
    pub count: usize,
    /// Display name of the filter.
    pub filter_label: &'static str,
    /// State to pass to the next call.
    pub state: DisplayState,
}

/// Reconcile a snapshot against the previous display state without eviction.
#[must_use]
pub fn reconcile(
    snapshot: &FlightSnapshot,
    filter: RegionFilter,
    previous: DisplayState,
) -> Reconciliation {
    reconcile_with(snapshot, filter, previous, Eviction::Never)
}

/// Reconcile a snapshot against the previous display state.
#[must_use]
pub fn reconcile_with(
    snapshot: &FlightSnapshot,
    filter: RegionFilter,
    previous: DisplayState,
    eviction: Eviction,
) -> Reconciliation {
    let mut state = previous;
    let mut mutations = Vec::new();
    let mut visible = HashSet::new();
    let mut followed_position = None;

    for flight in snapshot
        .flights()
        .iter()
        .filter(|f| filter.contains(f.lat, f.lon))
    {
        visible.insert(flight.id.as_str());

        if let Some(marker) = state.markers.get_mut(&flight.id) {
            marker.missed_polls = 0;
            if (marker.lat, marker.lon) != (flight.lat, flight.lon) {
                marker.lat = flight.lat;
                marker.lon = flight.lon;
                mutations.push(Mutation::MoveMarker {
                    id: flight.id.clone(),
                    lat: flight.lat,
                    lon: flight.lon,
                });
            }
        } else {
            state
                .markers
                .insert(flight.id.clone(), Marker::new(flight.lat, flight.lon));
            mutations.push(Mutation::CreateMarker {
                id: flight.id.clone(),
                lat: flight.lat,
                lon: flight.lon,
            });
        }

        if state.followed_id.as_deref() == Some(flight.id.as_str()) {
            followed_position = Some((flight.lat, flight.lon));
        }
    }

    let mut evicted = Vec::new();
    for (id, marker) in &mut state.markers {
        if visible.contains(id.as_str()) {
            continue;
        }
        marker.missed_polls = marker.missed_polls.saturating_add(1);
        if let Eviction::AfterMissedPolls(limit) = eviction {
            if marker.missed_polls >= limit.get() {
                evicted.push(id.clone());
            }
        }
    }
    for id in evicted {
        debug!("Evicting marker for {}", id);
        state.markers.remove(&id);
        mutations.push(Mutation::RemoveMarker { id });
    }

    if let Some((lat, lon)) = followed_position {
        mutations.push(Mutation::PanTo { lat, lon });
    }

    Reconciliation {
        mutations,
        count: visible.len(),
        filter_label: filter.display_name(),
        state,
    }
}

/// Configuration for a [`Reconciler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilerConfig {
    /// Initial region filter.
    pub filter: RegionFilter,
    /// Whether selecting a flight also follows it.
    pub follow_enabled: bool,
    /// Marker eviction policy.
    pub eviction: Eviction,
}

/// Owns display state between polls and applies user operations to it.
#[derive(Debug)]
pub struct Reconciler {
    state: DisplayState,
    filter: RegionFilter,
    eviction: Eviction,
    follow_enabled: bool,
    selected_id: Option<String>,
    latest: FlightSnapshot,
}

impl Reconciler {
    /// Create a reconciler with previously persisted bookmarks.
    #[must_use]
    pub fn new(config: ReconcilerConfig, bookmarks: Bookmarks) -> Self {
        Self {
            state: DisplayState {
                bookmarks,
                ..DisplayState::default()
            },
            filter: config.filter,
            eviction: config.eviction,
            follow_enabled: config.follow_enabled,
            selected_id: None,
            latest: FlightSnapshot::default(),
        }
    }

    /// Reconcile a new snapshot and remember it as the latest.
    ///
    /// The returned mutations end with the visible count and filter label.
    pub fn ingest(&mut self, snapshot: FlightSnapshot) -> Vec<Mutation> {
        let previous = std::mem::take(&mut self.state);
        let result = reconcile_with(&snapshot, self.filter, previous, self.eviction);

        debug!(
            "Reconciled {} of {} flights ({}): {} mutations",
            result.count,
            snapshot.len(),
            result.filter_label,
            result.mutations.len()
        );

        self.state = result.state;
        self.latest = snapshot;

        let mut mutations = result.mutations;
        mutations.push(Mutation::SetCount(result.count));
        mutations.push(Mutation::SetFilterLabel(result.filter_label));
        mutations
    }

    /// Current display state.
    #[must_use]
    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Most recently ingested snapshot.
    #[must_use]
    pub fn latest(&self) -> &FlightSnapshot {
        &self.latest
    }

    #[must_use]
    pub fn filter(&self) -> RegionFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: RegionFilter) {
        info!("Region filter set to {}", filter);
        self.filter = filter;
    }

    /// Follow a flight. The id need not be visible yet.
    pub fn select_follow(&mut self, id: impl Into<String>) {
        self.state.followed_id = Some(id.into());
    }

    pub fn clear_follow(&mut self) {
        self.state.followed_id = None;
    }

    #[must_use]
    pub fn followed_id(&self) -> Option<&str> {
        self.state.followed_id.as_deref()
    }

    #[must_use]
    pub fn follow_enabled(&self) -> bool {
        self.follow_enabled
    }

    /// Enable or disable follow mode. Disabling stops following.
    pub fn set_follow_enabled(&mut self, enabled: bool) {
        self.follow_enabled = enabled;
        if !enabled {
            self.clear_follow();
        }
    }

    /// Select a flight for the info panel, following it when follow mode is on.
    ///
    /// The flight is looked up in the latest snapshot, then in bookmarks.
    pub fn select_flight(&mut self, id: &str) -> Result<FlightState, TrackerError> {
        let flight = self
            .latest
            .get(id)
            .or_else(|| self.state.bookmarks.get(id))
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        self.selected_id = Some(flight.id.clone());
        if self.follow_enabled {
            self.select_follow(flight.id.clone());
        }
        Ok(flight)
    }

    /// Clear the info panel selection.
    pub fn deselect(&mut self) {
        self.selected_id = None;
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    /// Save the flight as it appears in the latest snapshot.
    pub fn toggle_bookmark(&mut self, id: &str) -> Result<&FlightState, TrackerError> {
        let flight = self
            .latest
            .get(id)
            .filter(|_| !id.is_empty())
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        info!("Saved flight {}", flight.label());
        self.state.bookmarks.insert(flight.id.clone(), flight);
        Ok(&self.state.bookmarks[id])
    }

    #[must_use]
    pub fn bookmarks(&self) -> &Bookmarks {
        &self.state.bookmarks
    }

    #[must_use]
    pub fn bookmark(&self, id: &str) -> Option<&FlightState> {
        self.state.bookmarks.get(id)
    }

    /// Saved flights in id order.
    #[must_use]
    pub fn bookmark_list(&self) -> Vec<FlightState> {
        self.state.bookmarks.values().cloned().collect()
    }

    /// Search the latest snapshot by callsign or id.
    #[must_use]
    pub fn find_by_query(&self, query: &str) -> Option<&FlightState> {
        self.latest.find_by_query(query)
    }
}
