use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;

use crate::{Res, api, config::Config, debug, types::PkceToken};

/// Serves `/health` and `/callback` on the configured address until the
/// process ends.
pub async fn start_api_server(state: Arc<Mutex<Option<PkceToken>>>, config: Config) -> Res<()> {
    let addr = SocketAddr::from_str(&config.server_address)
        .map_err(|e| format!("failed to parse server address '{}': {}", config.server_address, e))?;

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(state)))
        .layer(Extension(Arc::new(config)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("callback server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
