use std::collections::HashMap;

use async_trait::async_trait;

use super::{BATCH_SIZE, SpotifyClient};
use crate::{
    Res,
    config::MAX_TOP_TRACKS_LIMIT,
    debug,
    pipeline::{AudioFeatureSource, AudioFeatureVector, Track, TrackId, TrackSource},
    types::{AudioFeaturesResponse, TopTracksResponse},
};

#[async_trait]
impl TrackSource for SpotifyClient {
    /// Fetches up to `limit` top tracks (clamped to `1..=50`).
    ///
    /// Local files and tracks without an identified artist are skipped.
    async fn top_tracks(&self, limit: u32) -> Res<Vec<Track>> {
        let limit = limit.clamp(1, MAX_TOP_TRACKS_LIMIT);
        let res: TopTracksResponse = self.get(&format!("/me/top/tracks?limit={}", limit)).await?;

        let received = res.items.len();
        let tracks: Vec<Track> = res
            .items
            .into_iter()
            .filter_map(|item| item.into_track())
            .collect();

        if tracks.len() < received {
            debug!(
                "skipped {} top tracks without id or artist",
                received - tracks.len()
            );
        }
        Ok(tracks)
    }
}

#[async_trait]
impl AudioFeatureSource for SpotifyClient {
    async fn audio_features(
        &self,
        track_ids: &[TrackId],
    ) -> Res<HashMap<TrackId, AudioFeatureVector>> {
        let mut features = HashMap::with_capacity(track_ids.len());

        for chunk in track_ids.chunks(BATCH_SIZE) {
            let res: AudioFeaturesResponse = self
                .get(&format!("/audio-features?ids={}", chunk.join(",")))
                .await?;

            // unknown ids come back as null entries
            for obj in res.audio_features.iter().flatten() {
                features.insert(obj.id.clone(), AudioFeatureVector::from(obj));
            }
        }

        Ok(features)
    }
}
