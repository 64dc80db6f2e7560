use super::{load_client, spinner};
use crate::{
    config::{self, Config},
    error, info,
    management::{SelectionManager, StoreError},
    pipeline::{PlaylistSink, sources::Visibility},
    success,
};

pub async fn save(config: &Config, name: Option<String>, private: bool) {
    let selection = match SelectionManager::new(&config::data_dir()).load().await {
        Ok(selection) => selection,
        Err(StoreError::NotFound(_)) => {
            error!("No analyzed tracks found. Please run tastecluster analyze")
        }
        Err(e) => error!("Failed to load selection: {}", e),
    };

    if selection.tracks.is_empty() {
        error!("The stored selection is empty. Please run tastecluster analyze");
    }

    let client = load_client(config).await;
    let name = name.unwrap_or_else(|| selection.playlist_name.clone());
    let visibility = if private {
        Visibility::Private
    } else {
        Visibility::Public
    };

    let pb = spinner("Creating playlist...");
    let user = match client.current_user().await {
        Ok(user) => user,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to fetch user profile: {}", e)
        }
    };

    let playlist = match client.create_playlist(&user.id, &name, visibility).await {
        Ok(playlist) => playlist,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to create playlist: {}", e)
        }
    };

    let track_ids = selection.track_ids();
    if let Err(e) = client.add_tracks(&playlist.id, &track_ids).await {
        pb.finish_and_clear();
        error!("Playlist created but adding tracks failed: {}", e);
    }
    pb.finish_and_clear();

    success!(
        "Playlist '{}' created with {} {} tracks.",
        name,
        track_ids.len(),
        selection.top_genre
    );
    if let Some(url) = playlist.url {
        info!("{}", url);
    }
}
