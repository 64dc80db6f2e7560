use crate::{
    config, error, info,
    management::{SelectionManager, TokenManager},
    success,
};

pub async fn logout() {
    let data_dir = config::data_dir();

    let had_token = match TokenManager::clear(&data_dir).await {
        Ok(removed) => removed,
        Err(e) => error!("Failed to remove cached token: {}", e),
    };
    if let Err(e) = SelectionManager::new(&data_dir).clear().await {
        error!("Failed to remove stored selection: {}", e);
    }

    if had_token {
        success!("Logged out.");
    } else {
        info!("Not logged in, nothing to do.");
    }
}
