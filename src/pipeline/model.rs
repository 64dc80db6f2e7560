use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, Result};

pub type TrackId = String;
pub type ArtistId = String;

/// Genre labels of a track's primary artist, in the order the catalog lists them.
pub type GenreSet = Vec<String>;

/// One of the user's top tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub artist: String,
    pub artist_id: ArtistId,
    pub album_cover: String,
    pub popularity: u32,
    pub duration_ms: u64,
}

/// Continuous audio descriptors of a single track.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioFeatureVector {
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
}

/// A track joined with its audio descriptors; one row of the feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeatures {
    pub track: Track,
    pub audio: AudioFeatureVector,
}

impl TrackFeatures {
    pub fn id(&self) -> &str {
        &self.track.id
    }
}

/// Pairs every track with its audio descriptors, keeping the track order.
///
/// A track without descriptors is rejected rather than skipped; callers that
/// want to tolerate gaps must filter the track list first.
pub fn join_audio_features(
    tracks: &[Track],
    features: &HashMap<TrackId, AudioFeatureVector>,
) -> Result<Vec<TrackFeatures>> {
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    let mut rows = Vec::with_capacity(tracks.len());

    for track in tracks {
        if !seen.insert(track.id.as_str()) {
            return Err(PipelineError::InvalidInput(format!(
                "duplicate track id '{}'",
                track.id
            )));
        }

        match features.get(&track.id) {
            Some(audio) => rows.push(TrackFeatures {
                track: track.clone(),
                audio: *audio,
            }),
            None => missing.push(track.id.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "no audio features for track(s): {}",
            missing.join(",")
        )));
    }

    Ok(rows)
}
