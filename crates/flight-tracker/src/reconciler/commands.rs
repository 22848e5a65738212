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

//! User commands and their dispatch onto [`Reconciler`] operations.

use log::debug;

use super::Reconciler;
use crate::region::RegionFilter;
use crate::render::Mutation;
use crate::source::FlightState;

/// User action routed to the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Inspect a flight (and follow it when follow mode is on).
    SelectFlight(String),
    /// Close the info panel.
    Deselect,
    /// Switch the region filter.
    ChangeFilter(RegionFilter),
    /// Turn follow mode on or off.
    ToggleFollow(bool),
    /// Save the selected flight.
    SaveBookmark,
    /// Center on the first flight matching a callsign/id fragment.
    SearchQuery(String),
    /// Center on a saved flight.
    ShowBookmark(String),
}

/// Follow-up work the caller performs after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch image and trail for the selected flight, then show them.
    LoadDetails(FlightState),
    /// Write the bookmark set to durable storage.
    PersistBookmarks,
    /// Poll now instead of waiting for the next tick.
    PollNow,
}

/// Immediate mutations plus deferred effects of one command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub mutations: Vec<Mutation>,
    pub effects: Vec<Effect>,
}

impl Response {
    fn mutations(mutations: Vec<Mutation>) -> Self {
        Self {
            mutations,
            effects: Vec::new(),
        }
    }

    fn notice(message: String) -> Self {
        Self::mutations(vec![Mutation::Notify(message)])
    }
}

impl Reconciler {
    /// Apply a user command.
    pub fn handle(&mut self, command: Command) -> Response {
        debug!("Handling {:?}", command);

        match command {
            Command::SelectFlight(id) => match self.select_flight(&id) {
                Ok(flight) => Response {
                    mutations: vec![Mutation::ClearTrail],
                    effects: vec![Effect::LoadDetails(flight)],
                },
                Err(e) => Response::notice(e.to_string()),
            },
            Command::Deselect => {
                self.deselect();
                Response::mutations(vec![Mutation::ClearInfoPanel])
            }
            Command::ChangeFilter(filter) => {
                self.set_filter(filter);
                Response {
                    mutations: vec![Mutation::SetFilterLabel(filter.display_name())],
                    effects: vec![Effect::PollNow],
                }
            }
            Command::ToggleFollow(enabled) => {
                self.set_follow_enabled(enabled);
                Response::default()
            }
            Command::SaveBookmark => {
                let Some(id) = self.selected_id().map(str::to_string) else {
                    return Response::notice("No flight selected".to_string());
                };
                match self.toggle_bookmark(&id) {
                    Ok(flight) => {
                        let notice = format!("Saved flight {}", flight.label());
                        Response {
                            mutations: vec![
                                Mutation::RenderBookmarkList(self.bookmark_list()),
                                Mutation::Notify(notice),
                            ],
                            effects: vec![Effect::PersistBookmarks],
                        }
                    }
                    Err(_) => Response::notice("Flight data not found".to_string()),
                }
            }
            Command::SearchQuery(query) => match self.find_by_query(&query) {
                Some(flight) => Response::mutations(vec![Mutation::PanTo {
                    lat: flight.lat,
                    lon: flight.lon,
                }]),
                None => Response::default(),
            },
            Command::ShowBookmark(id) => match self.bookmark(&id) {
                Some(flight) => Response::mutations(vec![Mutation::PanTo {
                    lat: flight.lat,
                    lon: flight.lon,
                }]),
                None => Response::notice(format!("No saved flight '{id}'")),
            },
        }
    }
}
