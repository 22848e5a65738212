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

//! Flight tracking core: poll a flight-state feed and reconcile it against
//! what is already on the map.
//!
//! The library is split into layers that can be used on their own:
//!
//! - **Source layer**: snapshot model plus the OpenSky Network feed and
//!   planespotters.net image lookup
//! - **Reconciler layer**: pure snapshot-to-mutation diffing, follow mode,
//!   selection, search and bookmarks
//! - **Poller layer**: timer-driven, single-flight polling in a background task
//!
//! Rendering is left to the caller, which receives [`Mutation`] batches and
//! applies them through a [`Renderer`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use flight_tracker::{
//!     JsonFileStore, OpenSkySource, PlanespottersImages, Poller, PollerConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut poller = Poller::spawn(
//!         PollerConfig::default(),
//!         Arc::new(OpenSkySource::default()),
//!         Arc::new(PlanespottersImages::new()),
//!         Box::new(JsonFileStore::in_dir("/tmp/skywatch")),
//!     );
//!
//!     while let Some(batch) = poller.recv().await {
//!         for mutation in batch {
//!             println!("{mutation:?}");
//!         }
//!     }
//! }
//! ```
//!
//! # Reconciler Only
//!
//! ```
//! use flight_tracker::{reconcile, DisplayState, FlightSnapshot, FlightState, Mutation, RegionFilter};
//!
//! let snapshot = FlightSnapshot::new(
//!     None,
//!     vec![FlightState::new("A1", 51.0, 0.0), FlightState::new("B2", -80.0, 0.0)],
//! );
//! let result = reconcile(&snapshot, RegionFilter::Europe, DisplayState::default());
//!
//! assert_eq!(result.count, 1);
//! assert!(matches!(&result.mutations[0], Mutation::CreateMarker { id, .. } if id == "A1"));
//! ```

pub mod bookmarks;
pub mod poller;
pub mod reconciler;
pub mod region;
pub mod render;
pub mod source;

pub use bookmarks::{BookmarkStore, JsonFileStore, MemoryStore, StoreError};
pub use poller::{Poller, PollerConfig, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use reconciler::{
    reconcile, reconcile_with, Bookmarks, Command, DisplayState, Effect, Eviction, Reconciler,
    ReconcilerConfig, Reconciliation, Response, TrackerError,
};
pub use region::{BoundingBox, RegionFilter, UnknownRegion};
pub use render::{Mutation, Renderer};
pub use source::{
    FetchError, FlightSnapshot, FlightSource, FlightState, ImageLookup, OpenSkySource, ParseError,
    PlanespottersImages,
};
