//! Local persistence of the OAuth token and the last analyzed selection.
//!
//! Everything lives below the application data directory as pretty-printed
//! JSON:
//!
//! ```text
//! <data dir>/cache/token.json
//! <data dir>/cache/selection.json
//! ```

mod auth;
mod selection;

use std::{io::ErrorKind, path::Path};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub use auth::TokenManager;
pub use selection::{Selection, SelectionManager};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no cached {0} found")]
    NotFound(&'static str),

    #[error("cache i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed cache file: {0}")]
    Serde(#[from] serde_json::Error),
}

async fn read_json<T: DeserializeOwned>(path: &Path, what: &'static str) -> Result<T, StoreError> {
    let json = match async_fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(what)),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&json)?)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    async_fs::write(path, json).await?;
    Ok(())
}

/// Deletes `path`, reporting whether there was anything to delete.
async fn remove(path: &Path) -> Result<bool, StoreError> {
    match async_fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
