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

//! OpenWeatherMap overlay tiles.

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Available weather layer types from OpenWeatherMap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherLayer {
    Precipitation,
    #[default]
    Clouds,
    Wind,
}

impl WeatherLayer {
    /// Get the OpenWeatherMap layer name for URL construction
    pub fn as_str(self) -> &'static str {
        match self {
            WeatherLayer::Precipitation => "precipitation_new",
            WeatherLayer::Clouds => "clouds_new",
            WeatherLayer::Wind => "wind_new",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WeatherLayer::Precipitation => "Precipitation",
            WeatherLayer::Clouds => "Clouds",
            WeatherLayer::Wind => "Wind",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "precipitation" | "rain" => Some(WeatherLayer::Precipitation),
            "clouds" => Some(WeatherLayer::Clouds),
            "wind" => Some(WeatherLayer::Wind),
            _ => None,
        }
    }

    /// Tile URL template with `{z}/{x}/{y}` placeholders left for the map widget
    pub fn tile_url_template(self, api_key: &str) -> String {
        format!(
            "https://tile.openweathermap.org/map/{}/{{z}}/{{x}}/{{y}}.png?appid={}",
            self.as_str(),
            api_key
        )
    }
}

/// Resolve API key from environment variable or config
pub fn resolve_api_key(config_key: Option<&str>) -> Option<String> {
    // Check environment variable first
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            return Some(key);
        }
    }

    // Fall back to config
    config_key.map(str::to_string).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_template() {
        assert_eq!(
            WeatherLayer::Clouds.tile_url_template("KEY"),
            "https://tile.openweathermap.org/map/clouds_new/{z}/{x}/{y}.png?appid=KEY"
        );
    }

    #[test]
    fn test_parse_layer() {
        assert_eq!(WeatherLayer::parse("Wind"), Some(WeatherLayer::Wind));
        assert_eq!(WeatherLayer::parse("rain"), Some(WeatherLayer::Precipitation));
        assert_eq!(WeatherLayer::parse("snow"), None);
    }

    #[test]
    fn test_config_key_fallback() {
        if std::env::var(API_KEY_ENV).is_err() {
            assert_eq!(resolve_api_key(Some("abc")).as_deref(), Some("abc"));
            assert_eq!(resolve_api_key(Some("")), None);
            assert_eq!(resolve_api_key(None), None);
        }
    }
}
