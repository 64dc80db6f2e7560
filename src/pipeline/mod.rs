//! # Clustering Pipeline
//!
//! Groups a batch of tracks by their audio character and genre tags, selects
//! the most populous group and names its dominant genre.
//!
//! ## Stages
//!
//! ```text
//! rows (Track + AudioFeatureVector)
//!          ↓  artist genres per row (GenreSource)
//! encoder  → FeatureMatrix   numeric fields + one binary column per genre
//!          ↓
//! reduce   → ReducedMatrix   standardized, ≤ 10 principal components
//!          ↓
//! cluster  → ClusterResult   most populous cluster (strategy from registry)
//!          ↓
//! genre    → top genre       most frequent genre of the selected tracks
//! ```
//!
//! Each stage consumes the complete output of the previous one. The
//! [`Pipeline`] checks its cancellation token between stages, never inside
//! one, so a cancelled run never leaves half a result behind.
//!
//! The pipeline never reads the environment: everything it needs comes in
//! through [`PipelineConfig`] and the collaborator traits in [`sources`].

pub mod cluster;
pub mod encoder;
pub mod error;
pub mod genre;
pub mod model;
pub mod reduce;
pub mod sources;

use tokio_util::sync::CancellationToken;

pub use cluster::{ClusterResult, ClusteringStrategy, StrategyRegistry};
pub use encoder::{FeatureMatrix, FeatureSelection, NumericField, encode, parse_feature_fields};
pub use error::{PipelineError, Result};
pub use model::{AudioFeatureVector, GenreSet, Track, TrackFeatures, TrackId, join_audio_features};
pub use reduce::{ReducedMatrix, Reducer};
pub use sources::{
    ArtistGenreLookup, AudioFeatureSource, GenreSource, PlaylistSink, TrackGenreLookup,
    TrackSource,
};

pub const DEFAULT_STRATEGY: &str = cluster::KMeans::NAME;
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Registry name of the clustering strategy.
    pub strategy: String,
    pub features: FeatureSelection,
    pub max_components: usize,
    /// Genre lookups in flight at once.
    pub lookup_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            features: FeatureSelection::default(),
            max_components: reduce::MAX_COMPONENTS,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub strategy: &'static str,
    pub cluster: ClusterResult,
    pub top_genre: String,
    pub feature_columns: usize,
    pub components: usize,
}

impl PipelineOutcome {
    pub fn track_ids(&self) -> &[TrackId] {
        &self.cluster.track_ids
    }
}

#[derive(Debug)]
pub struct Pipeline {
    strategy: Box<dyn ClusteringStrategy>,
    reducer: Reducer,
    features: FeatureSelection,
    lookup_concurrency: usize,
}

impl Pipeline {
    /// Validates `config` against `registry` and builds the pipeline.
    pub fn new(config: PipelineConfig, registry: &StrategyRegistry) -> Result<Self> {
        if config.features.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one numeric feature must be selected".to_string(),
            ));
        }
        if config.max_components == 0 {
            return Err(PipelineError::Configuration(
                "at least one component must be kept".to_string(),
            ));
        }

        Ok(Self {
            strategy: registry.create(&config.strategy)?,
            reducer: Reducer::new(config.max_components),
            features: config.features,
            lookup_concurrency: config.lookup_concurrency.max(1),
        })
    }

    pub fn strategy(&self) -> &dyn ClusteringStrategy {
        self.strategy.as_ref()
    }

    /// Runs every stage over `rows`.
    ///
    /// `genres` supplies the artist genres used as features, `lookup` the
    /// genres counted for the selected cluster.
    pub async fn run<G, L>(
        &self,
        rows: &[TrackFeatures],
        genres: &G,
        lookup: &L,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome>
    where
        G: GenreSource + ?Sized,
        L: TrackGenreLookup + ?Sized,
    {
        if rows.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one track is required".to_string(),
            ));
        }

        checkpoint(cancel)?;
        let row_genres = genre::fetch_row_genres(rows, genres, self.lookup_concurrency).await?;

        checkpoint(cancel)?;
        let matrix = encode(rows, &row_genres, &self.features)?;

        checkpoint(cancel)?;
        let reduced = self.reducer.reduce(&matrix)?;

        checkpoint(cancel)?;
        let cluster = self.strategy.cluster(&reduced)?;

        checkpoint(cancel)?;
        let top_genre = genre::top_genre(&cluster.track_ids, lookup, self.lookup_concurrency).await?;

        Ok(PipelineOutcome {
            strategy: self.strategy.name(),
            cluster,
            top_genre,
            feature_columns: matrix.ncols(),
            components: reduced.ncols(),
        })
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::Res;
    use crate::pipeline::cluster::KMeans;

    struct Genres(HashMap<String, GenreSet>);

    #[async_trait]
    impl GenreSource for Genres {
        async fn artist_genres(&self, artist_id: &str) -> Res<GenreSet> {
            Ok(self.0.get(artist_id).cloned().unwrap_or_default())
        }
    }

    fn genres() -> Genres {
        Genres(HashMap::from([
            ("rocker".to_string(), vec!["rock".to_string(), "indie".to_string()]),
            ("crooner".to_string(), vec!["jazz".to_string()]),
        ]))
    }

    fn row(id: &str, artist_id: &str, energy: f64, acousticness: f64) -> TrackFeatures {
        TrackFeatures {
            track: Track {
                id: id.to_string(),
                name: format!("Song {id}"),
                artist: artist_id.to_string(),
                artist_id: artist_id.to_string(),
                album_cover: String::new(),
                popularity: 50,
                duration_ms: 180_000,
            },
            audio: AudioFeatureVector {
                energy,
                acousticness,
                tempo: 120.0,
                ..AudioFeatureVector::default()
            },
        }
    }

    fn batch() -> Vec<TrackFeatures> {
        vec![
            row("r1", "rocker", 0.9, 0.1),
            row("j1", "crooner", 0.2, 0.9),
            row("r2", "rocker", 0.9, 0.1),
            row("r3", "rocker", 0.9, 0.1),
            row("j2", "crooner", 0.2, 0.9),
            row("r4", "rocker", 0.9, 0.1),
        ]
    }

    fn two_cluster_pipeline() -> Pipeline {
        let mut registry = StrategyRegistry::empty();
        registry.register("pair", || Box::new(KMeans::new(2)));
        let config = PipelineConfig {
            strategy: "pair".to_string(),
            ..PipelineConfig::default()
        };
        Pipeline::new(config, &registry).unwrap()
    }

    #[test]
    fn default_config_uses_kmeans() {
        let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();
        assert_eq!(pipeline.strategy().name(), "kmeans");
    }

    #[test]
    fn unknown_strategy_is_rejected_up_front() {
        let config = PipelineConfig {
            strategy: "dbscan".to_string(),
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(config, &StrategyRegistry::default());
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn zero_components_is_rejected() {
        let config = PipelineConfig {
            max_components: 0,
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(config, &StrategyRegistry::default());
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn selects_largest_group_and_its_genre() {
        let rows = batch();
        let source = genres();
        let tracks: Vec<Track> = rows.iter().map(|r| r.track.clone()).collect();
        let lookup = ArtistGenreLookup::new(&tracks, &source);

        let outcome = two_cluster_pipeline()
            .run(&rows, &source, &lookup, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.strategy, "kmeans");
        assert_eq!(outcome.track_ids(), ["r1", "r2", "r3", "r4"]);
        assert_eq!(outcome.top_genre, "rock");
        // 7 numeric fields + indie, jazz, rock
        assert_eq!(outcome.feature_columns, 10);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_stage() {
        let rows = batch();
        let source = genres();
        let tracks: Vec<Track> = rows.iter().map(|r| r.track.clone()).collect();
        let lookup = ArtistGenreLookup::new(&tracks, &source);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = two_cluster_pipeline()
            .run(&rows, &source, &lookup, &cancel)
            .await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn empty_batch_is_invalid_input() {
        let source = genres();
        let lookup = ArtistGenreLookup::new(std::iter::empty(), &source);

        let result = two_cluster_pipeline()
            .run(&[], &source, &lookup, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn fewer_tracks_than_clusters_is_insufficient_data() {
        let rows = batch();
        let source = genres();
        let tracks: Vec<Track> = rows.iter().map(|r| r.track.clone()).collect();
        let lookup = ArtistGenreLookup::new(&tracks, &source);
        let pipeline = Pipeline::new(PipelineConfig::default(), &StrategyRegistry::default()).unwrap();

        let result = pipeline
            .run(&rows, &source, &lookup, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::InsufficientData(_))));
    }
}
