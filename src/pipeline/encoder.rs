//! Turns joined track rows and their genre sets into a numeric feature matrix.
//!
//! The matrix holds the selected numeric fields first, followed by one binary
//! column per distinct genre seen in the batch. Genre columns are sorted by
//! label, so the column layout depends only on the set of genres observed.

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use ndarray::Array2;

use super::{
    error::{PipelineError, Result},
    model::{GenreSet, TrackFeatures, TrackId},
};

/// A numeric attribute that can be used as a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericField {
    Danceability,
    Energy,
    Loudness,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
    Tempo,
    Popularity,
    DurationMs,
}

impl NumericField {
    pub const ALL: [NumericField; 11] = [
        NumericField::Danceability,
        NumericField::Energy,
        NumericField::Loudness,
        NumericField::Speechiness,
        NumericField::Acousticness,
        NumericField::Instrumentalness,
        NumericField::Liveness,
        NumericField::Valence,
        NumericField::Tempo,
        NumericField::Popularity,
        NumericField::DurationMs,
    ];

    /// Fields clustered on when nothing else is configured.
    pub const DEFAULT: [NumericField; 7] = [
        NumericField::Energy,
        NumericField::Loudness,
        NumericField::Speechiness,
        NumericField::Acousticness,
        NumericField::Instrumentalness,
        NumericField::Liveness,
        NumericField::Valence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Danceability => "danceability",
            NumericField::Energy => "energy",
            NumericField::Loudness => "loudness",
            NumericField::Speechiness => "speechiness",
            NumericField::Acousticness => "acousticness",
            NumericField::Instrumentalness => "instrumentalness",
            NumericField::Liveness => "liveness",
            NumericField::Valence => "valence",
            NumericField::Tempo => "tempo",
            NumericField::Popularity => "popularity",
            NumericField::DurationMs => "duration_ms",
        }
    }

    pub fn value(&self, row: &TrackFeatures) -> f64 {
        let audio = &row.audio;
        match self {
            NumericField::Danceability => audio.danceability,
            NumericField::Energy => audio.energy,
            NumericField::Loudness => audio.loudness,
            NumericField::Speechiness => audio.speechiness,
            NumericField::Acousticness => audio.acousticness,
            NumericField::Instrumentalness => audio.instrumentalness,
            NumericField::Liveness => audio.liveness,
            NumericField::Valence => audio.valence,
            NumericField::Tempo => audio.tempo,
            NumericField::Popularity => row.track.popularity as f64,
            NumericField::DurationMs => row.track.duration_ms as f64,
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        NumericField::ALL
            .iter()
            .find(|field| field.name() == normalized)
            .copied()
            .ok_or_else(|| format!("invalid value '{}'", s.trim()))
    }
}

/// Ordered, duplicate-free list of numeric feature columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSelection(Vec<NumericField>);

impl FeatureSelection {
    /// Builds a selection, keeping the first occurrence of repeated fields.
    pub fn new(fields: impl IntoIterator<Item = NumericField>) -> Self {
        let mut seen = HashSet::new();
        Self(fields.into_iter().filter(|f| seen.insert(*f)).collect())
    }

    pub fn fields(&self) -> &[NumericField] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FeatureSelection {
    fn default() -> Self {
        Self::new(NumericField::DEFAULT)
    }
}

impl fmt::Display for FeatureSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|field| field.name()).collect();
        f.write_str(&names.join(","))
    }
}

/// Parses a comma separated list of numeric field names.
///
/// Names are case-insensitive and `-` may be used in place of `_`.
/// Repeated names are collapsed into one column.
pub fn parse_feature_fields(input: &str) -> std::result::Result<FeatureSelection, String> {
    if input.trim().is_empty() {
        return Err("feature list cannot be empty".to_string());
    }

    let mut fields = Vec::new();
    for segment in input.split(',') {
        if segment.trim().is_empty() {
            return Err(format!("empty segment in '{}'", input));
        }
        fields.push(segment.parse::<NumericField>()?);
    }

    Ok(FeatureSelection::new(fields))
}

/// Column header of the feature matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Numeric(NumericField),
    Genre(String),
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Numeric(field) => write!(f, "{}", field),
            Column::Genre(label) => write!(f, "genre:{}", label),
        }
    }
}

/// Numeric matrix with one row per track and typed column headers.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub row_ids: Vec<TrackId>,
    pub columns: Vec<Column>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn genre_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c {
            Column::Genre(label) => Some(label.as_str()),
            Column::Numeric(_) => None,
        })
    }
}

/// Encodes rows and their positional genre sets into a [`FeatureMatrix`].
pub fn encode(
    rows: &[TrackFeatures],
    genres: &[GenreSet],
    selection: &FeatureSelection,
) -> Result<FeatureMatrix> {
    if rows.is_empty() {
        return Err(PipelineError::InvalidInput(
            "at least one track is required".to_string(),
        ));
    }
    if rows.len() != genres.len() {
        return Err(PipelineError::InvalidInput(format!(
            "{} tracks but {} genre sets",
            rows.len(),
            genres.len()
        )));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = rows.iter().find(|r| !seen.insert(r.id())) {
        return Err(PipelineError::InvalidInput(format!(
            "duplicate track id '{}'",
            dup.id()
        )));
    }

    let labels: Vec<&str> = genres
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let numeric = selection.len();
    let mut values = Array2::<f64>::zeros((rows.len(), numeric + labels.len()));

    for (i, (row, row_genres)) in rows.iter().zip(genres).enumerate() {
        for (j, field) in selection.fields().iter().enumerate() {
            values[[i, j]] = field.value(row);
        }
        for genre in row_genres {
            // labels is sorted, so the search always succeeds
            if let Ok(j) = labels.binary_search(&genre.as_str()) {
                values[[i, numeric + j]] = 1.0;
            }
        }
    }

    let columns = selection
        .fields()
        .iter()
        .map(|f| Column::Numeric(*f))
        .chain(labels.iter().map(|l| Column::Genre(l.to_string())))
        .collect();

    Ok(FeatureMatrix {
        row_ids: rows.iter().map(|r| r.track.id.clone()).collect(),
        columns,
        values,
    })
}
