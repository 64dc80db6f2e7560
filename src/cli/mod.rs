//! # CLI Module
//!
//! User-facing commands. Each command loads what it needs from the data
//! directory, talks to Spotify through [`SpotifyClient`] and reports with the
//! colored output macros; fatal problems end the process through `error!`.
//!
//! - [`auth`] - OAuth 2.0 PKCE login, caches the token
//! - [`analyze`] - clusters the top tracks and stores the selection
//! - [`save`] - creates a playlist from the stored selection
//! - [`strategies`] - lists the available clustering algorithms
//! - [`logout`] - forgets the cached token and selection
//!
//! ```bash
//! tastecluster auth
//! tastecluster analyze --strategy ward
//! tastecluster save --name "Late Night"
//! ```

mod analyze;
mod auth;
mod logout;
mod save;
mod strategies;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use analyze::analyze;
pub use auth::auth;
pub use logout::logout;
pub use save::save;
pub use strategies::strategies;

use crate::{config::Config, error, management::StoreError, spotify::SpotifyClient};

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

async fn load_client(config: &Config) -> SpotifyClient {
    match SpotifyClient::from_cache(config.clone(), &crate::config::data_dir()).await {
        Ok(client) => client,
        Err(crate::spotify::SpotifyError::Store(StoreError::NotFound(_))) => {
            error!("Not authenticated. Please run tastecluster auth")
        }
        Err(e) => error!(
            "Failed to load token. Please run tastecluster auth\n Error: {}",
            e
        ),
    }
}
