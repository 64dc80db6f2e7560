//! Genre lookups and the top genre of a cluster.

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt, stream};

use super::{
    error::{PipelineError, Result},
    model::{GenreSet, TrackFeatures, TrackId},
    sources::{GenreSource, TrackGenreLookup},
};

/// Fetches the primary artist genres of every row, in row order.
///
/// Up to `concurrency` lookups are in flight at once.
pub async fn fetch_row_genres<G: GenreSource + ?Sized>(
    rows: &[TrackFeatures],
    source: &G,
    concurrency: usize,
) -> Result<Vec<GenreSet>> {
    let genres = stream::iter(rows)
        .map(|row| source.artist_genres(&row.track.artist_id))
        .buffered(concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await?;
    Ok(genres)
}

/// Most frequent genre across the primary artists of `track_ids`.
///
/// Genres are accumulated in the order of `track_ids`, and a tie goes to the
/// genre that was encountered first.
pub async fn top_genre<L: TrackGenreLookup + ?Sized>(
    track_ids: &[TrackId],
    lookup: &L,
    concurrency: usize,
) -> Result<String> {
    let genres: Vec<GenreSet> = stream::iter(track_ids)
        .map(|id| lookup.track_genres(id))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    most_frequent(genres.iter().flatten().map(String::as_str)).ok_or_else(|| {
        PipelineError::EmptyResult(format!(
            "none of the {} selected tracks has a genre",
            track_ids.len()
        ))
    })
}

/// Most frequent label, the earliest one on ties.
pub fn most_frequent<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<String> {
    // label -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, label) in labels.into_iter().enumerate() {
        counts.entry(label).or_insert((0, position)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(label, _)| label.to_string())
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use super::*;
    use crate::Res;
    use crate::pipeline::model::{AudioFeatureVector, Track};
    use async_trait::async_trait;

    struct MapLookup(HashMap<String, GenreSet>);

    #[async_trait]
    impl TrackGenreLookup for MapLookup {
        async fn track_genres(&self, track_id: &str) -> Res<GenreSet> {
            self.0
                .get(track_id)
                .cloned()
                .ok_or_else(|| format!("no track {track_id}").into())
        }
    }

    fn lookup(entries: Vec<(&str, Vec<&str>)>) -> MapLookup {
        MapLookup(
            entries
                .into_iter()
                .map(|(id, genres)| {
                    (
                        id.to_string(),
                        genres.iter().map(|g| g.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    fn ids(ids: &[&str]) -> Vec<TrackId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn most_frequent_counts_labels() {
        let labels = ["rock", "pop", "pop", "rock", "pop", "pop", "rock", "pop"];
        assert_eq!(most_frequent(labels), Some("pop".to_string()));
    }

    #[test]
    fn most_frequent_breaks_ties_by_first_occurrence() {
        assert_eq!(
            most_frequent(["jazz", "soul", "soul", "jazz"]),
            Some("jazz".to_string())
        );
        assert_eq!(
            most_frequent(["soul", "jazz", "jazz", "soul"]),
            Some("soul".to_string())
        );
    }

    #[test]
    fn most_frequent_of_nothing_is_none() {
        assert_eq!(most_frequent(std::iter::empty()), None);
    }

    #[tokio::test]
    async fn top_genre_prefers_five_pop_over_three_rock() {
        let lookup = lookup(vec![
            ("a", vec!["pop", "rock"]),
            ("b", vec!["pop"]),
            ("c", vec!["rock", "pop"]),
            ("d", vec!["pop", "rock"]),
            ("e", vec!["pop"]),
        ]);

        let genre = top_genre(&ids(&["a", "b", "c", "d", "e"]), &lookup, 2)
            .await
            .unwrap();
        assert_eq!(genre, "pop");
    }

    #[tokio::test]
    async fn top_genre_without_genres_is_empty_result() {
        let lookup = lookup(vec![("a", vec![]), ("b", vec![])]);
        let result = top_genre(&ids(&["a", "b"]), &lookup, 4).await;
        assert!(matches!(result, Err(PipelineError::EmptyResult(_))));
    }

    #[tokio::test]
    async fn lookup_failure_is_upstream() {
        let lookup = lookup(vec![("a", vec!["pop"])]);
        let result = top_genre(&ids(&["a", "missing"]), &lookup, 1).await;
        assert!(matches!(result, Err(PipelineError::Upstream(_))));
    }

    /// Answers later for earlier keys and records the order answers go out.
    struct SlowCatalog {
        entries: Vec<(&'static str, u64, Vec<&'static str>)>,
        finished: Mutex<Vec<String>>,
    }

    impl SlowCatalog {
        /// The first two keys are jazz, the last two soul: a tie that row
        /// order resolves to jazz and completion order to soul.
        fn tied() -> Self {
            Self {
                entries: vec![
                    ("a", 80, vec!["jazz"]),
                    ("b", 60, vec!["jazz"]),
                    ("c", 40, vec!["soul"]),
                    ("d", 20, vec!["soul"]),
                ],
                finished: Mutex::new(Vec::new()),
            }
        }

        async fn answer(&self, key: &str) -> Res<GenreSet> {
            let (_, delay_ms, genres) = self
                .entries
                .iter()
                .find(|(k, _, _)| *k == key)
                .ok_or_else(|| format!("unknown key {key}"))?;
            tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            self.finished.lock().unwrap().push(key.to_string());
            Ok(genres.iter().map(|g| g.to_string()).collect())
        }

        fn finished(&self) -> Vec<String> {
            self.finished.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TrackGenreLookup for SlowCatalog {
        async fn track_genres(&self, track_id: &str) -> Res<GenreSet> {
            self.answer(track_id).await
        }
    }

    #[async_trait]
    impl GenreSource for SlowCatalog {
        async fn artist_genres(&self, artist_id: &str) -> Res<GenreSet> {
            self.answer(artist_id).await
        }
    }

    fn row(artist_id: &str) -> TrackFeatures {
        TrackFeatures {
            track: Track {
                id: format!("track_{artist_id}"),
                name: format!("Song by {artist_id}"),
                artist: artist_id.to_string(),
                artist_id: artist_id.to_string(),
                album_cover: String::new(),
                popularity: 40,
                duration_ms: 210_000,
            },
            audio: AudioFeatureVector::default(),
        }
    }

    #[tokio::test]
    async fn top_genre_tie_follows_track_order_not_completion_order() {
        let catalog = SlowCatalog::tied();

        let genre = top_genre(&ids(&["a", "b", "c", "d"]), &catalog, 4)
            .await
            .unwrap();

        assert_eq!(catalog.finished(), ids(&["d", "c", "b", "a"]));
        assert_eq!(genre, "jazz");
    }

    #[tokio::test]
    async fn row_genres_come_back_in_row_order() {
        let catalog = SlowCatalog::tied();
        let rows: Vec<TrackFeatures> = ["a", "b", "c", "d"].into_iter().map(row).collect();

        let genres = fetch_row_genres(&rows, &catalog, 3).await.unwrap();

        assert_ne!(catalog.finished(), ids(&["a", "b", "c", "d"]));
        assert_eq!(
            genres,
            vec![
                vec!["jazz".to_string()],
                vec!["jazz".to_string()],
                vec!["soul".to_string()],
                vec!["soul".to_string()],
            ]
        );
    }
}
