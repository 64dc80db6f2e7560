//! # Spotify Web API Client
//!
//! [`SpotifyClient`] is the production implementation of every collaborator
//! the clustering pipeline consumes. It owns the HTTP client, the cached
//! OAuth token and an in-memory artist genre cache, so genres fetched while
//! encoding are reused when the top genre is counted.
//!
//! ```text
//! cli::analyze / cli::save
//!          ↓
//! SpotifyClient
//!     ├── tracks    TrackSource, AudioFeatureSource
//!     ├── artists   GenreSource
//!     └── playlist  PlaylistSink
//!          ↓
//! send_with_retry (502 / 429 handling)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Endpoints
//!
//! - `GET /me` - current user profile
//! - `GET /me/top/tracks` - the user's top tracks
//! - `GET /audio-features` - audio descriptors, up to 100 ids per request
//! - `GET /artists/{id}` - artist genres
//! - `POST /users/{user_id}/playlists` - create a playlist
//! - `POST /playlists/{playlist_id}/tracks` - add up to 100 tracks per request
//!
//! ## Retries
//!
//! A `502 Bad Gateway` is retried after 10 seconds. A `429 Too Many Requests`
//! is retried after the `Retry-After` delay when that delay is at most two
//! minutes; longer delays are reported as [`SpotifyError::RateLimited`].
//!
//! Authentication (the PKCE flow and token refresh) lives in [`auth`].

pub mod artists;
pub mod auth;
pub mod playlist;
pub mod tracks;

use std::{collections::HashMap, path::Path, time::Duration};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::{sync::Mutex, time::sleep};

use crate::{
    config::Config,
    debug,
    management::{StoreError, TokenManager},
    pipeline::GenreSet,
    types::UserProfile,
    warning,
};

const MAX_RETRY_AFTER_SECS: u64 = 120;
const BAD_GATEWAY_DELAY: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 5;

/// Largest number of ids or URIs Spotify accepts in one batch request.
pub const BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited for {0} seconds, try again later")]
    RateLimited(u64),

    #[error("gave up after {0} attempts")]
    Exhausted(u32),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sends the request produced by `build`, retrying transient failures.
///
/// `build` is called once per attempt since a sent request is consumed.
pub async fn send_with_retry<F>(build: F) -> Result<Response, SpotifyError>
where
    F: Fn() -> RequestBuilder,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let response = build().send().await?;

        match response.status() {
            StatusCode::BAD_GATEWAY => {
                debug!("502 from Spotify (attempt {}), retrying", attempt);
                sleep(BAD_GATEWAY_DELAY).await;
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);

                if retry_after > MAX_RETRY_AFTER_SECS {
                    warning!(
                        "Spotify asks to wait {} seconds before the next request.",
                        retry_after
                    );
                    return Err(SpotifyError::RateLimited(retry_after));
                }
                debug!("429 from Spotify, waiting {} seconds", retry_after);
                sleep(Duration::from_secs(retry_after)).await;
            }
            _ => return Ok(response.error_for_status()?),
        }
    }

    Err(SpotifyError::Exhausted(MAX_ATTEMPTS))
}

pub struct SpotifyClient {
    http: Client,
    config: Config,
    tokens: Mutex<TokenManager>,
    genres: Mutex<HashMap<String, GenreSet>>,
}

impl SpotifyClient {
    pub fn new(config: Config, tokens: TokenManager) -> Self {
        Self {
            http: Client::new(),
            config,
            tokens: Mutex::new(tokens),
            genres: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a client around the token cached in `data_dir`.
    pub async fn from_cache(config: Config, data_dir: &Path) -> Result<Self, SpotifyError> {
        let tokens = TokenManager::load(data_dir).await?;
        Ok(Self::new(config, tokens))
    }

    pub async fn current_user(&self) -> Result<UserProfile, SpotifyError> {
        self.get("/me").await
    }

    async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut tokens = self.tokens.lock().await;
        tokens.get_valid_token(&self.http, &self.config).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SpotifyError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        let response = send_with_retry(|| self.http.get(&url).bearer_auth(&token)).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, SpotifyError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.access_token().await?;
        let url = self.url(path);
        let response =
            send_with_retry(|| self.http.post(&url).bearer_auth(&token).json(body)).await?;
        Ok(response.json::<T>().await?)
    }
}
