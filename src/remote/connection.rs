//! Shared HTTP client and error type for the player server.

use crate::reconcile::SongId;
use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

// Shared HTTP client with reasonable defaults for timeouts
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("lyricsync/", env!("CARGO_PKG_VERSION")))
        .timeout(TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
});

/// Errors that can occur talking to the player server
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed payload: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("server error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("unknown song {0}")]
    UnknownSong(SongId),
}

pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}

/// Join the server base URL and an endpoint path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
