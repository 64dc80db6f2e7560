//! HTTP endpoints of the local server used during `tastecluster auth`.
//!
//! - [`callback`] receives the authorization code from Spotify and exchanges
//!   it for a token, completing the PKCE flow.
//! - [`health`] reports status and version.
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use tastecluster::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
