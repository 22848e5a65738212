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

//! Durable storage for saved flights.
//!
//! Bookmarks are stored as one flat JSON object mapping flight id to the
//! flight's state at the time it was saved.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use thiserror::Error;

use crate::reconciler::Bookmarks;

/// File name used for bookmark storage.
pub const STORAGE_NAME: &str = "saved_flights.json";

/// Extension given to a bookmark file that could not be parsed.
pub const CORRUPT_EXTENSION: &str = "json.corrupt";

/// Errors from bookmark persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bookmark storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bookmark storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unreadable saved flights moved to {}: {source}", .backup.display())]
    MovedAside {
        backup: PathBuf,
        source: serde_json::Error,
    },
}

/// Key/value persistence for bookmarks.
pub trait BookmarkStore: Send + Sync {
    /// Load saved bookmarks; a store that was never written is empty.
    fn load(&self) -> Result<Bookmarks, StoreError>;

    /// Replace the stored bookmarks.
    fn persist(&self, bookmarks: &Bookmarks) -> Result<(), StoreError>;
}

/// Bookmarks stored in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store named [`STORAGE_NAME`] inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STORAGE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BookmarkStore for JsonFileStore {
    fn load(&self) -> Result<Bookmarks, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Bookmarks::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Bookmarks::new());
        }

        let bookmarks: Bookmarks = match serde_json::from_str(&contents) {
            Ok(bookmarks) => bookmarks,
            Err(source) => {
                // Keep the old data out of the way of the next persist
                let backup = self.path.with_extension(CORRUPT_EXTENSION);
                fs::rename(&self.path, &backup)?;
                warn!(
                    "Moved unreadable saved flights to {}",
                    backup.display()
                );
                return Err(StoreError::MovedAside { backup, source });
            }
        };
        info!(
            "Loaded {} saved flights from {}",
            bookmarks.len(),
            self.path.display()
        );
        Ok(bookmarks)
    }

    fn persist(&self, bookmarks: &Bookmarks) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(bookmarks)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Bookmarks>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookmarkStore for MemoryStore {
    fn load(&self) -> Result<Bookmarks, StoreError> {
        Ok(self
            .inner
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default())
    }

    fn persist(&self, bookmarks: &Bookmarks) -> Result<(), StoreError> {
        if let Ok(mut stored) = self.inner.lock() {
            stored.clone_from(bookmarks);
        }
        Ok(())
    }
}
