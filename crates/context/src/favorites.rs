//! Favorite places store — a small read-only JSON document.
//!
//! The file is read on every call so external edits (the user curating
//! their favorites by hand) show up on the next request. An absent or
//! unreadable file is not an error: the user simply has no favorites yet.

use nearbot_core::context::FavoriteEntry;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct FavoritesStore {
    path: PathBuf,
}

impl FavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the favorites list. Absent or corrupt file yields an empty list.
    pub async fn list(&self) -> Vec<FavoriteEntry> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %self.path.display(), "No favorites file, returning empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Skipping corrupt favorites file");
                Vec::new()
            }
        }
    }
}
