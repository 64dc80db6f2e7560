use crate::{
    config::{self, Config},
    error, info, spotify, success,
};

pub async fn auth(config: &Config) {
    info!("Waiting for Spotify authorization in the browser...");
    match spotify::auth::auth(config, &config::data_dir()).await {
        Ok(_) => success!("Authentication successful!"),
        Err(e) => error!("Authentication failed: {}", e),
    }
}
