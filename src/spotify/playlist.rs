use async_trait::async_trait;

use super::{BATCH_SIZE, SpotifyClient};
use crate::{
    Res,
    pipeline::{
        TrackId,
        sources::{CreatedPlaylist, PlaylistSink, Visibility},
    },
    types::{
        AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, CreatePlaylistRequest,
        CreatePlaylistResponse,
    },
    utils,
};

#[async_trait]
impl PlaylistSink for SpotifyClient {
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        visibility: Visibility,
    ) -> Res<CreatedPlaylist> {
        let body = CreatePlaylistRequest {
            name: name.to_string(),
            description: "Most prevalent cluster of my top tracks".to_string(),
            public: visibility.is_public(),
            collaborative: false,
        };

        let res: CreatePlaylistResponse = self
            .post(&format!("/users/{}/playlists", user_id), &body)
            .await?;

        Ok(CreatedPlaylist {
            id: res.id,
            url: res.external_urls.spotify,
        })
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Res<()> {
        let path = format!("/playlists/{}/tracks", playlist_id);

        for chunk in track_ids.chunks(BATCH_SIZE) {
            let body = AddTrackToPlaylistRequest {
                uris: chunk.iter().map(|id| utils::track_uri(id)).collect(),
            };
            let _: AddTrackToPlaylistResponse = self.post(&path, &body).await?;
        }

        Ok(())
    }
}
