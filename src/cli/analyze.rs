use std::collections::HashMap;

use chrono::Utc;
use tabled::Table;
use tokio_util::sync::CancellationToken;

use super::{load_client, spinner};
use crate::{
    config::{self, Config},
    debug, error, info,
    management::{Selection, SelectionManager},
    pipeline::{
        ArtistGenreLookup, AudioFeatureSource, Pipeline, PipelineError, StrategyRegistry, Track,
        TrackSource, join_audio_features,
    },
    success,
    types::TrackTableRow,
    warning,
};

pub async fn analyze(config: &Config, strategy: Option<String>, limit: Option<u32>) {
    let registry = StrategyRegistry::with_defaults();
    let pipeline = match Pipeline::new(config.pipeline_config(strategy.as_deref()), &registry) {
        Ok(pipeline) => pipeline,
        Err(e) => error!("{}", e),
    };

    let client = load_client(config).await;
    let limit = limit.unwrap_or(config.top_tracks_limit);

    let pb = spinner("Fetching top tracks...");
    let tracks = match client.top_tracks(limit).await {
        Ok(tracks) => tracks,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to fetch top tracks: {}", e)
        }
    };

    if tracks.is_empty() {
        pb.finish_and_clear();
        warning!("No top tracks found for this account yet.");
        return;
    }

    pb.set_message("Fetching audio features...");
    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let features = match client.audio_features(&ids).await {
        Ok(features) => features,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to fetch audio features: {}", e)
        }
    };
    pb.finish_and_clear();

    let (tracks, skipped): (Vec<Track>, Vec<Track>) = tracks
        .into_iter()
        .partition(|t| features.contains_key(&t.id));
    if !skipped.is_empty() {
        warning!(
            "Skipping {} tracks without audio features: {}",
            skipped.len(),
            skipped
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let rows = match join_audio_features(&tracks, &features) {
        Ok(rows) => rows,
        Err(e) => error!("{}", e),
    };

    info!(
        "Clustering {} tracks with {}...",
        rows.len(),
        pipeline.strategy().name()
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let pb = spinner("Looking up genres and clustering...");
    let lookup = ArtistGenreLookup::new(&tracks, &client);
    let result = pipeline.run(&rows, &client, &lookup, &cancel).await;
    watcher.abort();
    pb.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(PipelineError::Cancelled) => {
            warning!("Analysis cancelled, previous selection left untouched.");
            return;
        }
        Err(PipelineError::InsufficientData(msg)) => error!(
            "{}. Try a larger --limit or another --strategy.",
            msg
        ),
        Err(e) => error!("Analysis failed: {}", e),
    };

    debug!(
        "{} feature columns, {} components, cluster sizes {:?}",
        outcome.feature_columns, outcome.components, outcome.cluster.sizes
    );

    let by_id: HashMap<&str, &Track> = tracks.iter().map(|t| (t.id.as_str(), t)).collect();
    let selected: Vec<Track> = outcome
        .track_ids()
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).map(|t| (*t).clone()))
        .collect();

    let table_rows: Vec<TrackTableRow> = selected
        .iter()
        .enumerate()
        .map(|(i, track)| TrackTableRow::new(i + 1, track))
        .collect();
    println!("{}", Table::new(table_rows));

    success!(
        "{} of {} tracks share a cluster, top genre: {}",
        selected.len(),
        rows.len(),
        outcome.top_genre
    );

    let selection = Selection {
        strategy: outcome.strategy.to_string(),
        top_genre: outcome.top_genre,
        playlist_name: config.playlist_name.clone(),
        tracks: selected,
        created_at: Utc::now().timestamp() as u64,
    };

    if let Err(e) = SelectionManager::new(&config::data_dir())
        .store(&selection)
        .await
    {
        error!("Failed to store selection: {}", e);
    }
    info!("Run tastecluster save to create the playlist.");
}
