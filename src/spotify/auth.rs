use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Mutex;

use super::{SpotifyError, send_with_retry};
use crate::{
    config::Config,
    debug,
    management::TokenManager,
    server::start_api_server,
    types::{PkceToken, Token, TokenResponse},
    utils, warning,
};

const AUTH_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Runs the OAuth 2.0 PKCE flow and caches the resulting token in `data_dir`.
///
/// 1. generates a code verifier and its S256 challenge
/// 2. starts the local callback server
/// 3. opens the authorization URL in the browser
/// 4. waits up to a minute for the callback to exchange the code
/// 5. persists the token
pub async fn auth(config: &Config, data_dir: &Path) -> Result<Token, SpotifyError> {
    let shared_state: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));

    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let auth_url = utils::build_auth_url(config, &code_challenge)
        .map_err(|e| SpotifyError::Auth(format!("invalid authorization URL: {}", e)))?;

    // verifier must be in place before the browser can hit the callback
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier,
            token: None,
        });
    }

    let server_state = Arc::clone(&shared_state);
    let server_config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = start_api_server(server_state, server_config).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state)
        .await
        .ok_or_else(|| SpotifyError::Auth("authentication failed or timed out".to_string()))?;

    TokenManager::new(token.clone(), data_dir).persist().await?;
    Ok(token)
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let start = Instant::now();

    while start.elapsed() < AUTH_TIMEOUT {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|pkce| pkce.token.as_ref()) {
            return Some(token.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Exchanges a refresh token for a new access token.
///
/// Spotify may or may not rotate the refresh token; when the response carries
/// none, `refresh_token` stays in use.
pub async fn refresh_token(
    client: &Client,
    config: &Config,
    refresh_token: &str,
) -> Result<Token, SpotifyError> {
    debug!("refreshing access token");
    let res = send_with_retry(|| {
        client.post(&config.token_url).form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ])
    })
    .await
    .map_err(|e| SpotifyError::Auth(format!("token refresh failed: {}", e)))?;

    let body: TokenResponse = res.json().await?;
    Ok(into_token(body, Some(refresh_token)))
}

/// Exchanges the authorization code from the callback for a token.
///
/// `verifier` must be the code verifier whose challenge started the flow.
pub async fn exchange_code_pkce(
    client: &Client,
    config: &Config,
    code: &str,
    verifier: &str,
) -> Result<Token, SpotifyError> {
    let res = send_with_retry(|| {
        client.post(&config.token_url).form(&[
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", config.redirect_uri.as_str()),
        ])
    })
    .await?;

    let body: TokenResponse = res.json().await?;
    if body.refresh_token.is_none() {
        return Err(SpotifyError::Auth(
            "token response did not contain a refresh token".to_string(),
        ));
    }
    Ok(into_token(body, None))
}

fn into_token(body: TokenResponse, previous_refresh: Option<&str>) -> Token {
    Token {
        access_token: body.access_token,
        refresh_token: body
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default(),
        scope: body.scope.unwrap_or_default(),
        expires_in: body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        obtained_at: Utc::now().timestamp() as u64,
    }
}
