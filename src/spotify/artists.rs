use async_trait::async_trait;

use super::SpotifyClient;
use crate::{
    Res,
    pipeline::{GenreSet, GenreSource},
    types::Artist,
};

#[async_trait]
impl GenreSource for SpotifyClient {
    /// Genres of `artist_id`, fetched once per client and cached afterwards.
    async fn artist_genres(&self, artist_id: &str) -> Res<GenreSet> {
        if let Some(genres) = self.genres.lock().await.get(artist_id) {
            return Ok(genres.clone());
        }

        let artist: Artist = self.get(&format!("/artists/{}", artist_id)).await?;
        self.genres
            .lock()
            .await
            .insert(artist.id, artist.genres.clone());
        Ok(artist.genres)
    }
}
