//! HTTP implementation of the playback remote.

use crate::reconcile::{PlayStatus, SongId};
use crate::remote::PlaybackRemote;
use crate::remote::connection::{RemoteError, endpoint, http_client};
use crate::remote::types::{Envelope, PlaybackCommand, RemotePlayback, SongSummary};
use reqwest::Response;
use serde::de::DeserializeOwned;

/// Talks to the player server's `/lyric` and `/songs` endpoints.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    /// Search songs by name/lyric text. An empty query lists everything.
    pub async fn search_songs(&self, query: &str) -> Result<Vec<SongSummary>, RemoteError> {
        let mut url = endpoint(&self.base_url, "songs");
        if !query.is_empty() {
            url.push_str(&format!("?lyric={}", urlencoding::encode(query)));
        }
        let resp = http_client().get(&url).send().await?;
        let env: Envelope<Vec<SongSummary>> = read_envelope(resp).await?;
        match env.data {
            Some(songs) if env.code == 200 => Ok(songs),
            None if env.code == 200 => Ok(Vec::new()),
            _ => Err(RemoteError::Api {
                code: env.code,
                message: env.message,
            }),
        }
    }

    /// Switch the server to `song_id` and start it from `position`.
    pub async fn start_song(&self, song_id: SongId, position: f64) -> Result<(), RemoteError> {
        let songs = self.search_songs("").await?;
        if !songs.iter().any(|s| s.id == song_id) {
            return Err(RemoteError::UnknownSong(song_id));
        }
        self.commit_playback_state(PlaybackCommand {
            song_id,
            progress: position,
            speed: 1.0,
            is_playing: PlayStatus::Playing,
        })
        .await
    }
}

/// Decode a `{code, message, data}` body. 5xx responses without a JSON
/// body surface as API errors rather than decode errors.
async fn read_envelope<T: DeserializeOwned>(resp: Response) -> Result<Envelope<T>, RemoteError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    match serde_json::from_slice::<Envelope<T>>(&body) {
        Ok(env) => Ok(env),
        Err(_) if !status.is_success() => Err(RemoteError::Api {
            code: status.as_u16().into(),
            message: status.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

impl PlaybackRemote for HttpRemote {
    async fn fetch_playback_state(&self) -> Result<Option<RemotePlayback>, RemoteError> {
        let resp = http_client()
            .get(endpoint(&self.base_url, "lyric"))
            .send()
            .await?;
        if resp.status().is_server_error() {
            return Err(RemoteError::Api {
                code: resp.status().as_u16().into(),
                message: resp.status().to_string(),
            });
        }
        let env: Envelope<RemotePlayback> = read_envelope(resp).await?;
        match env.data {
            Some(data) if env.code == 200 => Ok(Some(data)),
            _ => {
                // The server answers "nothing playing" with an error envelope.
                tracing::debug!(code = env.code, message = %env.message, "no active playback");
                Ok(None)
            }
        }
    }

    async fn commit_playback_state(&self, cmd: PlaybackCommand) -> Result<(), RemoteError> {
        let resp = http_client()
            .post(endpoint(&self.base_url, "lyric"))
            .json(&cmd)
            .send()
            .await?;
        let env: Envelope<serde_json::Value> = read_envelope(resp).await?;
        if env.code != 200 {
            return Err(RemoteError::Api {
                code: env.code,
                message: env.message,
            });
        }
        Ok(())
    }
}
