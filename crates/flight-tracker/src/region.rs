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

//! Named geographic region filters.
//!
//! Each region is a closed latitude/longitude rectangle. Boxes never cross
//! the anti-meridian, so a flight at 179.9°E and one at 179.9°W can never
//! share a region.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed-interval latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Region filter applied to each snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionFilter {
    /// No filtering.
    #[default]
    None,
    Europe,
    NorthAmerica,
    Asia,
    SouthAmerica,
    Africa,
    Oceania,
}

impl RegionFilter {
    /// Every filter, in menu order.
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::Europe,
        Self::NorthAmerica,
        Self::Asia,
        Self::SouthAmerica,
        Self::Africa,
        Self::Oceania,
    ];

    /// Bounding box for the region, `None` for the unfiltered view.
    #[must_use]
    pub fn bounds(self) -> Option<BoundingBox> {
        let (min_lat, max_lat, min_lon, max_lon) = match self {
            Self::None => return None,
            Self::Europe => (35.0, 70.0, -25.0, 45.0),
            Self::NorthAmerica => (10.0, 75.0, -170.0, -50.0),
            Self::Asia => (5.0, 80.0, 45.0, 180.0),
            Self::SouthAmerica => (-60.0, 15.0, -90.0, -30.0),
            Self::Africa => (-35.0, 35.0, -20.0, 55.0),
            Self::Oceania => (-50.0, 0.0, 110.0, 180.0),
        };
        Some(BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Whether a position passes this filter.
    #[must_use]
    pub fn contains(self, lat: f64, lon: f64) -> bool {
        self.bounds().map_or(true, |b| b.contains(lat, lon))
    }

    /// Human-readable label.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "All Regions",
            Self::Europe => "Europe",
            Self::NorthAmerica => "North America",
            Self::Asia => "Asia",
            Self::SouthAmerica => "South America",
            Self::Africa => "Africa",
            Self::Oceania => "Oceania",
        }
    }

    /// Identifier used in configuration files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Europe => "europe",
            Self::NorthAmerica => "north-america",
            Self::Asia => "asia",
            Self::SouthAmerica => "south-america",
            Self::Africa => "africa",
            Self::Oceania => "oceania",
        }
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown region '{0}' (expected one of: none, europe, north-america, asia, south-america, africa, oceania)")]
pub struct UnknownRegion(pub String);

impl FromStr for RegionFilter {
    type Err = UnknownRegion;

    /// Accepts identifiers (`north-america`), display names (`North America`)
    /// and compact forms (`NorthAmerica`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "" | "none" | "all" | "allregions" => Ok(Self::None),
            "europe" => Ok(Self::Europe),
            "northamerica" => Ok(Self::NorthAmerica),
            "asia" => Ok(Self::Asia),
            "southamerica" => Ok(Self::SouthAmerica),
            "africa" => Ok(Self::Africa),
            "oceania" => Ok(Self::Oceania),
            _ => Err(UnknownRegion(s.to_string())),
        }
    }
}
