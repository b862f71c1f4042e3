//! Clock reconciliation: merges low-frequency authoritative snapshots from
//! the remote player with local high-frequency extrapolation.
//!
//! Every snapshot is treated as ground truth, with two exceptions:
//! - while a gesture or commit owns the position (`hold`), snapshots are
//!   recorded but never move the anchor;
//! - a snapshot that is *slightly* behind the running estimate (within the
//!   drift tolerance) while playing does not pull the display backward.
//!
//! Larger disagreements re-anchor immediately and are reported as a
//! [`DriftCorrection`].

use crate::timer::{PlaybackTimer, sanitize_position, sanitize_speed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Remote play state. On the wire: `0 = paused`, `1 = playing`,
/// `2 = stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown play status flag {0}")]
pub struct InvalidPlayStatus(pub u8);

impl TryFrom<u8> for PlayStatus {
    type Error = InvalidPlayStatus;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            0 => Ok(PlayStatus::Paused),
            1 => Ok(PlayStatus::Playing),
            2 => Ok(PlayStatus::Stopped),
            other => Err(InvalidPlayStatus(other)),
        }
    }
}

impl From<PlayStatus> for u8 {
    fn from(status: PlayStatus) -> u8 {
        match status {
            PlayStatus::Paused => 0,
            PlayStatus::Playing => 1,
            PlayStatus::Stopped => 2,
        }
    }
}

impl fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayStatus::Stopped => "Stopped",
            PlayStatus::Playing => "Playing",
            PlayStatus::Paused => "Paused",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub u64);

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One authoritative read of the remote player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub position: f64,
    pub speed: f64,
    pub duration: f64,
    pub status: PlayStatus,
    pub song_id: SongId,
    pub received_at: Instant,
}

/// A visible jump caused by a snapshot disagreeing with the estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCorrection {
    pub from: f64,
    pub to: f64,
}

/// What a snapshot did to the local clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapshotEffect {
    /// Re-anchored on the snapshot position.
    Applied,
    /// Snapshot was slightly behind; the running estimate was kept.
    Held,
    /// Re-anchored with a jump larger than the drift tolerance.
    Corrected(DriftCorrection),
    /// Recorded only; a gesture, commit or settle window owns the position.
    Suppressed,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    last_snapshot: Option<PlaybackSnapshot>,
    timer: PlaybackTimer,
    status: PlayStatus,
    duration: f64,
    drift_tolerance: f64,
    settle: Duration,
    settle_until: Option<Instant>,
}

impl Reconciler {
    pub fn new(now: Instant, drift_tolerance: f64, settle: Duration) -> Self {
        Self {
            last_snapshot: None,
            timer: PlaybackTimer::new(now),
            status: PlayStatus::Stopped,
            duration: 0.0,
            drift_tolerance: drift_tolerance.max(0.0),
            settle,
            settle_until: None,
        }
    }

    /// Feed a fresh snapshot. With `hold` set the snapshot is only recorded.
    pub fn on_snapshot(&mut self, snap: PlaybackSnapshot, now: Instant, hold: bool) -> SnapshotEffect {
        let prior_song = self.last_snapshot.as_ref().map(|s| s.song_id);
        self.last_snapshot = Some(snap.clone());

        if hold {
            return SnapshotEffect::Suppressed;
        }
        if let Some(until) = self.settle_until {
            if now < until && !self.agrees_with(&snap, now) {
                return SnapshotEffect::Suppressed;
            }
            self.settle_until = None;
        }
        self.apply(&snap, now, prior_song == Some(snap.song_id))
    }

    fn apply(&mut self, snap: &PlaybackSnapshot, now: Instant, same_song: bool) -> SnapshotEffect {
        let at = snap.received_at.min(now);
        let was_playing = self.status == PlayStatus::Playing;
        let estimate = self.current_position(at);
        let authoritative = sanitize_position(snap.position);

        self.duration = sanitize_position(snap.duration);
        self.status = snap.status;
        let authoritative = self.clamp(authoritative);
        let behind = estimate - authoritative;

        let effect = if same_song
            && was_playing
            && snap.status == PlayStatus::Playing
            && behind > 0.0
            && behind <= self.drift_tolerance
        {
            self.timer.set_position(estimate, at);
            SnapshotEffect::Held
        } else {
            self.timer.set_position(authoritative, at);
            if same_song && (authoritative - estimate).abs() > self.drift_tolerance {
                SnapshotEffect::Corrected(DriftCorrection { from: estimate, to: authoritative })
            } else {
                SnapshotEffect::Applied
            }
        };
        // Fold speed in after anchoring so the anchor reflects the old speed.
        self.timer.set_speed(sanitize_speed(snap.speed), at, false);
        effect
    }

    fn agrees_with(&self, snap: &PlaybackSnapshot, now: Instant) -> bool {
        let at = snap.received_at.min(now);
        snap.status == self.status
            && (sanitize_position(snap.position) - self.current_position(at)).abs() <= self.drift_tolerance
    }

    /// Reconciled position at `now`, clamped to the song duration when known.
    pub fn current_position(&self, now: Instant) -> f64 {
        let playing = self.status == PlayStatus::Playing;
        self.clamp(self.timer.estimate_at(now, playing))
    }

    /// Clamp to `[0, duration]`. An unknown (zero) duration has no upper bound.
    pub fn clamp(&self, position: f64) -> f64 {
        let p = sanitize_position(position);
        if self.duration > 0.0 { p.min(self.duration) } else { p }
    }

    /// Optimistically move the local clock to a committed seek target.
    pub fn seek_to(&mut self, position: f64, now: Instant) {
        let p = self.clamp(position);
        self.timer.set_position(p, now);
    }

    /// Ignore disagreeing snapshots for the settle window, giving the
    /// remote time to catch up with a local commit.
    pub fn begin_settle(&mut self, now: Instant) {
        self.settle_until = Some(now + self.settle);
    }

    pub fn set_status(&mut self, status: PlayStatus, now: Instant) {
        let p = self.current_position(now);
        self.timer.set_position(p, now);
        self.status = status;
    }

    pub fn set_speed(&mut self, speed: f64, now: Instant) {
        let p = self.current_position(now);
        self.timer.set_position(p, now);
        self.timer.set_speed(speed, now, false);
    }

    /// Forget everything: the remote reports nothing is playing.
    pub fn clear(&mut self, now: Instant) {
        self.last_snapshot = None;
        self.status = PlayStatus::Stopped;
        self.duration = 0.0;
        self.settle_until = None;
        self.timer = PlaybackTimer::new(now);
    }

    pub fn last_snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn song_id(&self) -> Option<SongId> {
        self.last_snapshot.as_ref().map(|s| s.song_id)
    }

    pub fn status(&self) -> PlayStatus {
        self.status
    }

    pub fn speed(&self) -> f64 {
        self.timer.speed()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_settling(&self, now: Instant) -> bool {
        self.settle_until.is_some_and(|until| now < until)
    }
}
