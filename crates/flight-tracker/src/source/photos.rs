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

//! Aircraft photo lookup from planespotters.net.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchError, ImageLookup};

const PLANESPOTTERS_HEX_URL: &str = "https://api.planespotters.net/pub/photos/hex";

#[derive(Debug, Clone, Deserialize)]
struct ThumbnailInfo {
    src: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PhotoInfo {
    thumbnail_large: ThumbnailInfo,
}

#[derive(Debug, Clone, Deserialize)]
struct PlanespottersResponse {
    #[serde(default)]
    photos: Vec<PhotoInfo>,
}

#[derive(Debug)]
struct CacheEntry {
    url: Option<String>,
    timestamp: Instant,
}

/// Image lookup by ICAO hex code, caching hits and misses.
#[derive(Debug)]
pub struct PlanespottersImages {
    client: reqwest::Client,
    base_url: String,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_ttl: Duration,
}

impl PlanespottersImages {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(PLANESPOTTERS_HEX_URL)
    }

    /// Create a lookup against a different endpoint.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::from_secs(3600 * 24), // Cache for 24 hours
        }
    }

    async fn fetch_from_api(&self, icao_hex: &str) -> Result<Option<String>, FetchError> {
        let url = format!("{}/{}", self.base_url, icao_hex.to_lowercase());
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let data: PlanespottersResponse = response.json().await?;
        Ok(first_photo_url(data))
    }

    fn get_from_cache(&self, key: &str) -> Option<Option<String>> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(key)
            .filter(|entry| entry.timestamp.elapsed() < self.cache_ttl)
            .map(|entry| entry.url.clone())
    }

    /// Cache a result, dropping entries that have expired.
    fn store_in_cache(&self, key: &str, url: Option<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|_, entry| entry.timestamp.elapsed() < self.cache_ttl);
            cache.insert(
                key.to_string(),
                CacheEntry {
                    url,
                    timestamp: Instant::now(),
                },
            );
        }
    }
}

impl Default for PlanespottersImages {
    fn default() -> Self {
        Self::new()
    }
}

fn first_photo_url(response: PlanespottersResponse) -> Option<String> {
    response
        .photos
        .into_iter()
        .next()
        .map(|photo| photo.thumbnail_large.src)
}

#[async_trait]
impl ImageLookup for PlanespottersImages {
    async fn try_fetch_image(&self, id: &str) -> Result<Option<String>, FetchError> {
        let key = id.to_lowercase();
        if let Some(cached) = self.get_from_cache(&key) {
            return Ok(cached);
        }

        match self.fetch_from_api(&key).await {
            Ok(url) => {
                self.store_in_cache(&key, url.clone());
                Ok(url)
            }
            Err(e) => {
                // Cache the failure to avoid repeated requests
                self.store_in_cache(&key, None);
                Err(e)
            }
        }
    }
}
