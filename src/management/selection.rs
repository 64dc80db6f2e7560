use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{StoreError, read_json, remove, write_json};
use crate::pipeline::{Track, TrackId};

/// Outcome of the last `analyze` run, waiting to be saved as a playlist.
///
/// A selection is never edited: every analysis replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub strategy: String,
    pub top_genre: String,
    pub playlist_name: String,
    /// Members of the selected cluster, in top-track order.
    pub tracks: Vec<Track>,
    pub created_at: u64,
}

impl Selection {
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }
}

pub struct SelectionManager {
    path: PathBuf,
}

impl SelectionManager {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("cache").join("selection.json"),
        }
    }

    pub async fn store(&self, selection: &Selection) -> Result<(), StoreError> {
        write_json(&self.path, selection).await
    }

    pub async fn load(&self) -> Result<Selection, StoreError> {
        read_json(&self.path, "selection").await
    }

    pub async fn clear(&self) -> Result<bool, StoreError> {
        remove(&self.path).await
    }
}
