//! Remote player boundary: fetch the authoritative playback state and
//! commit local changes back.

pub mod connection;
pub mod playback;
pub mod types;

use std::future::Future;

pub use connection::RemoteError;
pub use playback::HttpRemote;
pub use types::{PlaybackCommand, RemotePlayback};

/// The two operations the sync engine needs from the remote player.
///
/// `fetch_playback_state` returns `Ok(None)` when the remote authoritatively
/// reports that nothing is playing; `Err` is a transport or payload failure.
pub trait PlaybackRemote: Send + Sync + 'static {
    fn fetch_playback_state(
        &self,
    ) -> impl Future<Output = Result<Option<RemotePlayback>, RemoteError>> + Send;

    fn commit_playback_state(
        &self,
        cmd: PlaybackCommand,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
