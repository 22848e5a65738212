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

//! Application configuration management.
//!
//! Configuration is stored in TOML format via confy. Every field has a serde
//! default so older or hand-edited files keep loading as options are added.

use std::path::PathBuf;
use std::time::Duration;

use flight_tracker::source::{DEFAULT_STATES_URL, DEFAULT_TRACKS_URL};
use flight_tracker::{
    Eviction, JsonFileStore, PollerConfig, ReconcilerConfig, RegionFilter, DEFAULT_POLL_INTERVAL,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::weather::WeatherLayer;

/// Name used for the config file and the data directory.
pub const APP_NAME: &str = "skywatch";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Endpoint returning all current state vectors
    #[serde(default = "default_states_url")]
    pub states_url: String,

    /// Endpoint returning a single aircraft's track
    #[serde(default = "default_tracks_url")]
    pub tracks_url: String,

    /// Seconds between polls (positive)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Region filter applied at startup
    #[serde(default)]
    pub region: RegionFilter,

    /// Follow the selected flight each poll
    #[serde(default)]
    pub follow_enabled: bool,

    /// Remove markers after this many polls without the flight (never when unset)
    #[serde(default)]
    pub evict_after_polls: Option<u32>,

    /// Override the saved-flights file location
    #[serde(default)]
    pub bookmarks_path: Option<PathBuf>,

    /// Show major airport landmarks at startup
    #[serde(default = "default_true")]
    pub show_airports: bool,

    /// Show the weather overlay at startup
    #[serde(default)]
    pub show_weather: bool,

    /// Weather overlay layer
    #[serde(default)]
    pub weather_layer: WeatherLayer,

    /// OpenWeatherMap API key (optional, env var takes precedence)
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1 // Current schema version
}

fn default_states_url() -> String {
    DEFAULT_STATES_URL.to_string()
}

fn default_tracks_url() -> String {
    DEFAULT_TRACKS_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            states_url: default_states_url(),
            tracks_url: default_tracks_url(),
            poll_interval_secs: default_poll_interval_secs(),
            region: RegionFilter::None,
            follow_enabled: false,
            evict_after_polls: None,
            bookmarks_path: None,
            show_airports: true,
            show_weather: false,
            weather_layer: WeatherLayer::default(),
            openweathermap_api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Poll interval, falling back to the default for a zero value
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval_secs == 0 {
            warn!(
                "poll_interval_secs must be positive, using {} seconds",
                default_poll_interval_secs()
            );
            return DEFAULT_POLL_INTERVAL;
        }
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Settings for the polling loop
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval(),
            reconciler: ReconcilerConfig {
                filter: self.region,
                follow_enabled: self.follow_enabled,
                eviction: Eviction::from_polls(self.evict_after_polls),
            },
            ..PollerConfig::default()
        }
    }

    /// Where saved flights live: the configured override, else the user data directory
    pub fn bookmark_store(&self) -> JsonFileStore {
        if let Some(path) = &self.bookmarks_path {
            return JsonFileStore::new(path);
        }

        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".skywatch"))
            .join(APP_NAME);
        JsonFileStore::in_dir(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.region, RegionFilter::None);
        assert!(!config.follow_enabled);
        assert_eq!(config.states_url, DEFAULT_STATES_URL);
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_poller_config() {
        let config = AppConfig {
            poll_interval_secs: 30,
            region: RegionFilter::Asia,
            follow_enabled: true,
            evict_after_polls: Some(4),
            ..AppConfig::default()
        };
        let poller = config.poller_config();

        assert_eq!(poller.interval, Duration::from_secs(30));
        assert_eq!(poller.reconciler.filter, RegionFilter::Asia);
        assert!(poller.reconciler.follow_enabled);
        assert_eq!(poller.reconciler.eviction, Eviction::from_polls(Some(4)));
    }

    #[test]
    fn test_bookmarks_path_override() {
        let config = AppConfig {
            bookmarks_path: Some(PathBuf::from("/tmp/flights.json")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.bookmark_store().path(),
            std::path::Path::new("/tmp/flights.json")
        );
    }
}
