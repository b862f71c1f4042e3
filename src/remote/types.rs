//! Wire types for the player server's JSON API.

use crate::reconcile::{PlayStatus, PlaybackSnapshot, SongId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Instant;

/// Every response is wrapped as `{code, message, data}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// `data` of `GET /lyric`: the song the server is currently "playing".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePlayback {
    #[serde(default)]
    pub name: String,
    pub song_id: SongId,
    #[serde(default)]
    pub lyric: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub progress: f64,
    #[serde(default = "default_speed", deserialize_with = "deserialize_speed")]
    pub speed: f64,
    pub is_playing: PlayStatus,
}

fn default_speed() -> f64 {
    1.0
}

fn deserialize_speed<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(1.0))
}

impl RemotePlayback {
    pub fn to_snapshot(&self, received_at: Instant) -> PlaybackSnapshot {
        PlaybackSnapshot {
            position: self.progress,
            speed: self.speed,
            duration: self.duration,
            status: self.is_playing,
            song_id: self.song_id,
            received_at,
        }
    }
}

/// Body of `POST /lyric`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackCommand {
    pub song_id: SongId,
    pub progress: f64,
    #[serde(serialize_with = "serialize_speed")]
    pub speed: f64,
    pub is_playing: PlayStatus,
}

/// The server stores speed as an unsigned integer and rejects `2.0`, so
/// whole speeds go out as integers.
fn serialize_speed<S: Serializer>(speed: &f64, s: S) -> Result<S::Ok, S::Error> {
    if speed.fract() == 0.0 && *speed >= 0.0 && *speed <= u32::MAX as f64 {
        s.serialize_u32(*speed as u32)
    } else {
        s.serialize_f64(*speed)
    }
}

/// One row of `GET /songs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongSummary {
    #[serde(rename = "ID")]
    pub id: SongId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration: f64,
}
