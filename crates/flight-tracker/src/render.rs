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

//! Callback interface to the rendering collaborator.

use crate::source::FlightState;

/// One instruction for the rendering collaborator.
///
/// Marker handles belong to the renderer; mutations only carry flight ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Place a new marker for a flight.
    CreateMarker { id: String, lat: f64, lon: f64 },
    /// Move an existing marker.
    MoveMarker { id: String, lat: f64, lon: f64 },
    /// Remove a marker that is no longer tracked.
    RemoveMarker { id: String },
    /// Recenter the view.
    PanTo { lat: f64, lon: f64 },
    /// Show details for the selected flight.
    SetInfoPanel {
        flight: FlightState,
        image_url: Option<String>,
    },
    /// Hide the details panel.
    ClearInfoPanel,
    /// Draw the historical path of the selected flight.
    DrawTrail(Vec<(f64, f64)>),
    /// Remove any drawn trail.
    ClearTrail,
    /// Number of flights visible under the active filter.
    SetCount(usize),
    /// Display name of the active filter.
    SetFilterLabel(&'static str),
    /// Replace the saved-flights list.
    RenderBookmarkList(Vec<FlightState>),
    /// User-visible notice.
    Notify(String),
}

/// Receiver of mutations, typically a map widget or console view.
pub trait Renderer {
    fn apply(&mut self, mutation: &Mutation);

    fn apply_all(&mut self, mutations: &[Mutation]) {
        for mutation in mutations {
            self.apply(mutation);
        }
    }
}
