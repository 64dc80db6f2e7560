use std::collections::HashMap;

use async_trait::async_trait;
use tastecluster::Res;
use tastecluster::pipeline::cluster::Ward;
use tastecluster::pipeline::*;
use tokio_util::sync::CancellationToken;

/// In-memory catalog: artist id -> genres.
struct FakeCatalog {
    genres: HashMap<String, GenreSet>,
}

#[async_trait]
impl GenreSource for FakeCatalog {
    async fn artist_genres(&self, artist_id: &str) -> Res<GenreSet> {
        self.genres
            .get(artist_id)
            .cloned()
            .ok_or_else(|| format!("artist {artist_id} not found").into())
    }
}

fn track(id: &str, artist_id: &str) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Track {id}"),
        artist: format!("Artist {artist_id}"),
        artist_id: artist_id.to_string(),
        album_cover: String::new(),
        popularity: 60,
        duration_ms: 200_000,
    }
}

fn audio(energy: f64, loudness: f64, acousticness: f64, valence: f64) -> AudioFeatureVector {
    AudioFeatureVector {
        danceability: 0.5,
        energy,
        loudness,
        speechiness: 0.05,
        acousticness,
        instrumentalness: 0.1,
        liveness: 0.12,
        valence,
        tempo: 118.0,
    }
}

/// Ten tracks: six share one audio profile and the genre "indie", the other
/// four are all different from each other and from the indie profile.
fn top_tracks() -> (Vec<Track>, HashMap<TrackId, AudioFeatureVector>, FakeCatalog) {
    let indie = audio(0.62, -7.5, 0.31, 0.44);
    let mut tracks = Vec::new();
    let mut features = HashMap::new();

    let others = [
        ("o1", "metal_band", audio(0.98, -3.1, 0.01, 0.20)),
        ("o2", "pianist", audio(0.12, -21.0, 0.97, 0.15)),
        ("o3", "pop_star", audio(0.80, -4.9, 0.08, 0.92)),
        ("o4", "rapper", audio(0.71, -6.0, 0.12, 0.55)),
    ];

    for (i, (id, artist, profile)) in others.into_iter().enumerate() {
        tracks.push(track(id, artist));
        features.insert(id.to_string(), profile);

        let (number, band) = (i + 1, i % 2);
        let indie_id = format!("i{number}");
        tracks.push(track(&indie_id, &format!("indie_band_{band}")));
        features.insert(indie_id, indie);
    }
    for id in ["i5", "i6"] {
        tracks.push(track(id, "indie_band_0"));
        features.insert(id.to_string(), indie);
    }

    let catalog = FakeCatalog {
        genres: HashMap::from([
            ("metal_band".to_string(), vec!["metal".to_string()]),
            ("pianist".to_string(), vec!["classical".to_string()]),
            (
                "pop_star".to_string(),
                vec!["pop".to_string(), "dance pop".to_string()],
            ),
            ("rapper".to_string(), vec!["hip hop".to_string()]),
            ("indie_band_0".to_string(), vec!["indie".to_string()]),
            ("indie_band_1".to_string(), vec!["indie".to_string()]),
        ]),
    };

    (tracks, features, catalog)
}

fn indie_ids() -> Vec<TrackId> {
    ["i1", "i2", "i3", "i4", "i5", "i6"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[tokio::test]
async fn test_most_prevalent_cluster_is_the_indie_group() {
    let (tracks, features, catalog) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let lookup = ArtistGenreLookup::new(&tracks, &catalog);

    let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();
    let outcome = pipeline
        .run(&rows, &catalog, &lookup, &CancellationToken::new())
        .await
        .unwrap();

    let mut selected = outcome.track_ids().to_vec();
    selected.sort();
    assert_eq!(selected, indie_ids());
    assert_eq!(outcome.top_genre, "indie");
    assert_eq!(outcome.cluster.labels.len(), 10);
    // 7 numeric fields + classical, dance pop, hip hop, indie, metal, pop
    assert_eq!(outcome.feature_columns, 13);
    assert_eq!(outcome.components, 10);
}

#[tokio::test]
async fn test_repeated_runs_select_the_same_cluster() {
    let (tracks, features, catalog) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let lookup = ArtistGenreLookup::new(&tracks, &catalog);
    let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();

    let first = pipeline
        .run(&rows, &catalog, &lookup, &CancellationToken::new())
        .await
        .unwrap();
    let second = pipeline
        .run(&rows, &catalog, &lookup, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_registered_ward_strategy_finds_the_same_group() {
    let (tracks, features, catalog) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let lookup = ArtistGenreLookup::new(&tracks, &catalog);

    let mut registry = StrategyRegistry::with_defaults();
    registry.register("ward5", || Box::new(Ward::new(5)));
    let config = PipelineConfig {
        strategy: "ward5".to_string(),
        ..PipelineConfig::default()
    };

    let outcome = Pipeline::new(config, &registry)
        .unwrap()
        .run(&rows, &catalog, &lookup, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.strategy, "ward");
    assert_eq!(outcome.track_ids(), indie_ids());
    assert_eq!(outcome.top_genre, "indie");
}

#[tokio::test]
async fn test_cancelled_before_first_step() {
    let (tracks, features, catalog) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let lookup = ArtistGenreLookup::new(&tracks, &catalog);
    let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline.run(&rows, &catalog, &lookup, &cancel).await;
    assert!(matches!(result, Err(PipelineError::Cancelled)));
}

#[tokio::test]
async fn test_tracks_without_genres_yield_empty_result() {
    let (tracks, features, _) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let catalog = FakeCatalog {
        genres: tracks
            .iter()
            .map(|t| (t.artist_id.clone(), Vec::new()))
            .collect(),
    };
    let lookup = ArtistGenreLookup::new(&tracks, &catalog);
    let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();

    let result = pipeline
        .run(&rows, &catalog, &lookup, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(PipelineError::EmptyResult(_))));
}

#[tokio::test]
async fn test_collaborator_failure_is_passed_through() {
    let (tracks, features, _) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let catalog = FakeCatalog {
        genres: HashMap::new(),
    };
    let lookup = ArtistGenreLookup::new(&tracks, &catalog);
    let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();

    match pipeline
        .run(&rows, &catalog, &lookup, &CancellationToken::new())
        .await
    {
        Err(PipelineError::Upstream(e)) => assert!(e.to_string().contains("not found")),
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[test]
fn test_encode_rejects_mismatched_lengths() {
    let (tracks, features, _) = top_tracks();
    let rows = join_audio_features(&tracks, &features).unwrap();
    let genres = vec![vec!["indie".to_string()]; rows.len() - 1];

    let result = encode(&rows, &genres, &FeatureSelection::default());
    assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
}

#[test]
fn test_missing_audio_features_are_rejected() {
    let (tracks, mut features, _) = top_tracks();
    features.remove("o2");

    match join_audio_features(&tracks, &features) {
        Err(PipelineError::InvalidInput(msg)) => assert!(msg.contains("o2")),
        other => panic!("expected invalid input, got {other:?}"),
    }
}

#[test]
fn test_unknown_strategy_is_a_configuration_error() {
    let config = PipelineConfig {
        strategy: "gaussian_mixture".to_string(),
        ..PipelineConfig::default()
    };
    let result = Pipeline::new(config, &StrategyRegistry::default());
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}
