use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::{
    pipeline::{AudioFeatureVector, Track},
    utils,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

/// Body of the token endpoint for both code exchange and refresh.
///
/// A refresh response may omit `refresh_token`, in which case the old one
/// stays valid.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    pub items: Vec<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    /// Absent for local files.
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub duration_ms: u64,
    pub artists: Vec<SimpleArtist>,
    pub album: AlbumObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

impl TrackObject {
    /// Converts into a [`Track`] keyed by its first artist.
    ///
    /// Returns `None` for tracks without an id or without an identified artist.
    pub fn into_track(self) -> Option<Track> {
        let id = self.id?;
        let artist = self.artists.into_iter().next()?;
        let artist_id = artist.id?;

        Some(Track {
            id,
            name: self.name,
            artist: artist.name,
            artist_id,
            album_cover: self
                .album
                .images
                .into_iter()
                .next()
                .map(|image| image.url)
                .unwrap_or_default(),
            popularity: self.popularity,
            duration_ms: self.duration_ms,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeaturesObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesObject {
    pub id: String,
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    // duplicated on the track object, which is the one used
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl From<&AudioFeaturesObject> for AudioFeatureVector {
    fn from(obj: &AudioFeaturesObject) -> Self {
        AudioFeatureVector {
            danceability: obj.danceability,
            energy: obj.energy,
            loudness: obj.loudness,
            speechiness: obj.speechiness,
            acousticness: obj.acousticness,
            instrumentalness: obj.instrumentalness,
            liveness: obj.liveness,
            valence: obj.valence,
            tempo: obj.tempo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistResponse {
    pub snapshot_id: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    #[tabled(rename = "#")]
    pub position: usize,
    pub name: String,
    pub artist: String,
    pub popularity: u32,
    pub duration: String,
}

impl TrackTableRow {
    pub fn new(position: usize, track: &Track) -> Self {
        Self {
            position,
            name: track.name.clone(),
            artist: track.artist.clone(),
            popularity: track.popularity,
            duration: utils::format_duration(track.duration_ms),
        }
    }
}
