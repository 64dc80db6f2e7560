use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;

use super::{StoreError, read_json, remove, write_json};
use crate::{config::Config, debug, spotify, spotify::SpotifyError, types::Token};

/// Seconds before the real expiry at which a token is treated as expired.
const EXPIRY_BUFFER_SECS: u64 = 240;

pub struct TokenManager {
    token: Token,
    path: PathBuf,
}

impl TokenManager {
    pub fn new(token: Token, data_dir: &Path) -> Self {
        TokenManager {
            token,
            path: Self::token_path(data_dir),
        }
    }

    pub async fn load(data_dir: &Path) -> Result<Self, StoreError> {
        let path = Self::token_path(data_dir);
        let token: Token = read_json(&path, "token").await?;
        Ok(Self { token, path })
    }

    pub async fn persist(&self) -> Result<(), StoreError> {
        write_json(&self.path, &self.token).await
    }

    /// Removes the cached token; `Ok(false)` when there was none.
    pub async fn clear(data_dir: &Path) -> Result<bool, StoreError> {
        remove(&Self::token_path(data_dir)).await
    }

    /// Access token that is valid for at least a few more minutes,
    /// refreshing and persisting it first when necessary.
    pub async fn get_valid_token(
        &mut self,
        client: &Client,
        config: &Config,
    ) -> Result<String, SpotifyError> {
        if self.is_expired(Utc::now().timestamp() as u64) {
            debug!("access token expired, refreshing");
            let fresh =
                spotify::auth::refresh_token(client, config, &self.token.refresh_token).await?;
            self.token = fresh;
            self.persist().await?;
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self, now: u64) -> bool {
        let lifetime = self.token.expires_in.saturating_sub(EXPIRY_BUFFER_SECS);
        now >= self.token.obtained_at + lifetime
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }

    fn token_path(data_dir: &Path) -> PathBuf {
        data_dir.join("cache").join("token.json")
    }
}
