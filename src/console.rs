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

//! Text renderer that prints map mutations to a terminal.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use chrono::Local;
use flight_tracker::{FlightState, Mutation, Renderer};
use log::{debug, warn};

/// Airport landmark shown alongside the flights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub code: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

pub const MAJOR_AIRPORTS: [Landmark; 3] = [
    Landmark {
        code: "LHR",
        name: "London Heathrow",
        lat: 51.47,
        lon: -0.4543,
    },
    Landmark {
        code: "JFK",
        name: "New York JFK",
        lat: 40.6413,
        lon: -73.7781,
    },
    Landmark {
        code: "DXB",
        name: "Dubai International",
        lat: 25.2532,
        lon: 55.3657,
    },
];

/// Marker as the console view keeps it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MarkerHandle {
    lat: f64,
    lon: f64,
}

/// Renders mutations as console output.
#[derive(Debug)]
pub struct ConsoleRenderer<W: Write> {
    out: W,
    markers: HashMap<String, MarkerHandle>,
    center: Option<(f64, f64)>,
    filter_label: &'static str,
    overlay: Option<String>,
    landmarks: Vec<Landmark>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            markers: HashMap::new(),
            center: None,
            filter_label: "All Regions",
            overlay: None,
            landmarks: Vec::new(),
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Replace the airport landmarks; an empty slice hides them.
    pub fn set_landmarks(&mut self, landmarks: &[Landmark]) {
        if landmarks.is_empty() && !self.landmarks.is_empty() {
            self.line(format_args!("Airport landmarks hidden"));
        }
        self.landmarks = landmarks.to_vec();

        for airport in landmarks {
            self.line(format_args!(
                "Airport {} ({}) at {:.4}, {:.4}",
                airport.code, airport.name, airport.lat, airport.lon
            ));
        }
    }

    /// Set or clear the weather overlay description.
    pub fn set_overlay(&mut self, overlay: Option<String>) {
        match &overlay {
            Some(description) => self.line(format_args!("Weather overlay: {description}")),
            None if self.overlay.is_some() => self.line(format_args!("Weather overlay hidden")),
            None => {}
        }
        self.overlay = overlay;
    }

    /// Print free-form text such as help output.
    pub fn print(&mut self, text: &str) {
        self.line(format_args!("{text}"));
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{args}") {
            warn!("Console write failed: {}", e);
        }
    }

    fn info_panel(&mut self, flight: &FlightState, image_url: Option<&str>) {
        let callsign = flight.callsign.as_deref().unwrap_or("N/A").to_string();
        let altitude = flight
            .altitude
            .map_or_else(|| "N/A".to_string(), |a| format!("{a:.0} m"));
        let speed = flight
            .velocity
            .map_or_else(|| "N/A".to_string(), |v| format!("{v:.0} m/s"));
        let country = flight.origin_country.as_deref().unwrap_or("N/A").to_string();

        self.line(format_args!("---- {callsign} ----"));
        self.line(format_args!("  ICAO24:   {}", flight.id));
        self.line(format_args!("  Altitude: {altitude}"));
        self.line(format_args!("  Speed:    {speed}"));
        self.line(format_args!("  Country:  {country}"));
        if let Some(heading) = flight.heading {
            self.line(format_args!("  Heading:  {heading:.0}°"));
        }
        if let Some(url) = image_url {
            self.line(format_args!("  Photo:    {url}"));
        }
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::CreateMarker { id, lat, lon } => {
                debug!("marker {} created at {:.4}, {:.4}", id, lat, lon);
                self.markers.insert(id.clone(), MarkerHandle { lat: *lat, lon: *lon });
            }
            Mutation::MoveMarker { id, lat, lon } => {
                if let Some(marker) = self.markers.get_mut(id) {
                    marker.lat = *lat;
                    marker.lon = *lon;
                } else {
                    warn!("Move for unknown marker {}", id);
                }
            }
            Mutation::RemoveMarker { id } => {
                if let Some(marker) = self.markers.remove(id) {
                    debug!("marker {} removed at {:.4}, {:.4}", id, marker.lat, marker.lon);
                }
            }
            Mutation::PanTo { lat, lon } => {
                if self.center != Some((*lat, *lon)) {
                    self.line(format_args!("Centered on {lat:.4}, {lon:.4}"));
                }
                self.center = Some((*lat, *lon));
            }
            Mutation::SetInfoPanel { flight, image_url } => {
                self.info_panel(flight, image_url.as_deref());
            }
            Mutation::ClearInfoPanel => self.line(format_args!("Details closed")),
            Mutation::DrawTrail(points) => {
                self.line(format_args!("  Trail:    {} points", points.len()));
            }
            Mutation::ClearTrail => {}
            Mutation::SetCount(count) => {
                let label = self.filter_label;
                let airports = self.landmarks.len();
                let now = Local::now().format("%H:%M:%S");
                if airports == 0 {
                    self.line(format_args!("[{now}] Planes: {count} | {label}"));
                } else {
                    self.line(format_args!(
                        "[{now}] Planes: {count} | {label} | Airports: {airports}"
                    ));
                }
            }
            Mutation::SetFilterLabel(label) => self.filter_label = label,
            Mutation::RenderBookmarkList(flights) => {
                if flights.is_empty() {
                    self.line(format_args!("No saved flights"));
                    return;
                }
                self.line(format_args!("Saved flights:"));
                for flight in flights {
                    self.line(format_args!("  {} ({})", flight.label(), flight.id));
                }
            }
            Mutation::Notify(message) => self.line(format_args!("* {message}")),
        }
    }
}
