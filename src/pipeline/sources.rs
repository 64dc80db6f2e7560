//! Collaborator interfaces the pipeline consumes.
//!
//! The Spotify client implements all of them; tests use in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    error::PipelineError,
    model::{AudioFeatureVector, GenreSet, Track, TrackId},
};
use crate::Res;

#[async_trait]
pub trait TrackSource: Send + Sync {
    /// The current user's most played tracks, most played first.
    async fn top_tracks(&self, limit: u32) -> Res<Vec<Track>>;
}

#[async_trait]
pub trait AudioFeatureSource: Send + Sync {
    /// Audio descriptors keyed by track id. Tracks without descriptors are absent.
    async fn audio_features(&self, track_ids: &[TrackId])
    -> Res<HashMap<TrackId, AudioFeatureVector>>;
}

#[async_trait]
pub trait GenreSource: Send + Sync {
    async fn artist_genres(&self, artist_id: &str) -> Res<GenreSet>;
}

/// Resolves the genres of a track's primary artist from the track id alone.
#[async_trait]
pub trait TrackGenreLookup: Send + Sync {
    async fn track_genres(&self, track_id: &str) -> Res<GenreSet>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PlaylistSink: Send + Sync {
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        visibility: Visibility,
    ) -> Res<CreatedPlaylist>;

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Res<()>;
}

/// [`TrackGenreLookup`] backed by the tracks of the current batch and a
/// [`GenreSource`]: track id → primary artist id → artist genres.
pub struct ArtistGenreLookup<'a, G: ?Sized> {
    artists: HashMap<&'a str, &'a str>,
    source: &'a G,
}

impl<'a, G: GenreSource + ?Sized> ArtistGenreLookup<'a, G> {
    pub fn new(tracks: impl IntoIterator<Item = &'a Track>, source: &'a G) -> Self {
        Self {
            artists: tracks
                .into_iter()
                .map(|t| (t.id.as_str(), t.artist_id.as_str()))
                .collect(),
            source,
        }
    }
}

#[async_trait]
impl<'a, G: GenreSource + ?Sized> TrackGenreLookup for ArtistGenreLookup<'a, G> {
    async fn track_genres(&self, track_id: &str) -> Res<GenreSet> {
        let artist_id = self.artists.get(track_id).copied().ok_or_else(|| {
            PipelineError::InvalidInput(format!("track '{}' is not part of this batch", track_id))
        })?;
        self.source.artist_genres(artist_id).await
    }
}
