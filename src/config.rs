//! Configuration loading.
//!
//! Values come from the process environment, which [`load_env`] first fills
//! from a `.env` file in the local data directory. Variables already set in
//! the environment take precedence over the file.
//!
//! [`Config::from_env`] reads everything once at startup; nothing below the
//! CLI layer touches the environment afterwards.

use std::{env, path::PathBuf};

use thiserror::Error;

use crate::pipeline::{
    FeatureSelection, PipelineConfig, StrategyRegistry, parse_feature_fields,
    reduce::MAX_COMPONENTS,
};

pub const APP_DIR: &str = "tastecluster";

pub const DEFAULT_SCOPE: &str = "user-top-read playlist-modify-public";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_PLAYLIST_NAME: &str = "Top Tracks Cluster Playlist";
pub const DEFAULT_TOP_TRACKS_LIMIT: u32 = 50;
pub const MAX_TOP_TRACKS_LIMIT: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to load .env file: {0}")]
    EnvFile(String),
}

/// Directory holding the `.env` file and every cache of the application.
///
/// - Linux: `~/.local/share/tastecluster`
/// - macOS: `~/Library/Application Support/tastecluster`
/// - Windows: `%LOCALAPPDATA%/tastecluster`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Loads `<data dir>/.env` into the process environment.
///
/// A missing file is not an error: every variable may just as well come from
/// the environment itself.
pub async fn load_env() -> Result<(), ConfigError> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| ConfigError::EnvFile(e.to_string()))?;

    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| ConfigError::EnvFile(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_address: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub top_tracks_limit: u32,
    pub playlist_name: String,
    pub clustering_algorithm: String,
    pub features: FeatureSelection,
    pub lookup_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let top_tracks_limit = match get("TOP_TRACKS_LIMIT") {
            Some(raw) => parse_limit(&raw).map_err(|reason| ConfigError::Invalid {
                name: "TOP_TRACKS_LIMIT",
                reason,
            })?,
            None => DEFAULT_TOP_TRACKS_LIMIT,
        };

        let features = match get("CLUSTER_FEATURES") {
            Some(raw) => parse_feature_fields(&raw).map_err(|reason| ConfigError::Invalid {
                name: "CLUSTER_FEATURES",
                reason,
            })?,
            None => FeatureSelection::default(),
        };

        let lookup_concurrency = match get("GENRE_LOOKUP_CONCURRENCY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "GENRE_LOOKUP_CONCURRENCY",
                        reason: format!("expected a positive integer, got '{}'", raw),
                    });
                }
            },
            None => crate::pipeline::DEFAULT_LOOKUP_CONCURRENCY,
        };

        Ok(Self {
            server_address: required("SERVER_ADDRESS")?,
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            redirect_uri: required("SPOTIFY_API_REDIRECT_URI")?,
            scope: or_default("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            auth_url: or_default("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: or_default("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: or_default("SPOTIFY_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            top_tracks_limit,
            playlist_name: or_default("PLAYLIST_NAME", DEFAULT_PLAYLIST_NAME),
            clustering_algorithm: or_default(
                "CLUSTERING_ALGORITHM",
                crate::pipeline::DEFAULT_STRATEGY,
            )
            .to_ascii_lowercase(),
            features,
            lookup_concurrency,
        })
    }

    /// Fails when the configured algorithm is not in `registry`.
    pub fn validate(&self, registry: &StrategyRegistry) -> Result<(), ConfigError> {
        if registry.contains(&self.clustering_algorithm) {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                name: "CLUSTERING_ALGORITHM",
                reason: format!(
                    "unknown algorithm '{}' (available: {})",
                    self.clustering_algorithm,
                    registry.names().join(", ")
                ),
            })
        }
    }

    /// Pipeline settings, optionally overriding the configured strategy.
    pub fn pipeline_config(&self, strategy: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            strategy: strategy
                .map(str::to_string)
                .unwrap_or_else(|| self.clustering_algorithm.clone()),
            features: self.features.clone(),
            max_components: MAX_COMPONENTS,
            lookup_concurrency: self.lookup_concurrency,
        }
    }
}

/// Parses a top-tracks limit in `1..=50`.
pub fn parse_limit(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(n) if (1..=MAX_TOP_TRACKS_LIMIT).contains(&n) => Ok(n),
        _ => Err(format!(
            "expected an integer between 1 and {}, got '{}'",
            MAX_TOP_TRACKS_LIMIT,
            raw.trim()
        )),
    }
}
