// state.rs: Engine state (timeline, clock, gestures) and the render view model

use crate::lyrics::{Timeline, parse_synced_lyrics, resolve};
use crate::pool::EngineConfig;
use crate::reconcile::{PlayStatus, Reconciler, SongId};
use crate::seek::SeekController;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a transient notice (e.g. a failed seek) stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Consecutive poll failures before the view is flagged as stale.
pub const STALE_AFTER_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// No poll has completed yet.
    #[default]
    Loading,
    /// Nothing is known to be playing.
    NoPlayback,
    Active,
}

/// A lyric line as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewLine {
    pub index: usize,
    pub text: String,
    pub is_current: bool,
}

/// Read-only snapshot of everything the UI renders, rebuilt every tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub availability: Availability,
    pub timeline: Timeline,
    /// Bumped whenever `timeline` is replaced; cached layout keyed on it.
    pub timeline_version: u64,
    /// Window of lines around `current`.
    pub lines: Vec<ViewLine>,
    pub current: Option<usize>,
    pub position: f64,
    pub duration: f64,
    pub progress: f64,
    pub status: PlayStatus,
    pub speed: f64,
    pub song_id: Option<SongId>,
    pub song_name: String,
    pub dragging: bool,
    pub notice: Option<String>,
    /// The last several polls failed; the display is extrapolating blind.
    pub stale: bool,
}

/// `position / duration` in `[0, 1]`; 0 when the duration is unknown.
pub fn progress_fraction(position: f64, duration: f64) -> f64 {
    if !(duration.is_finite() && duration > 0.0) || !position.is_finite() {
        return 0.0;
    }
    (position / duration).clamp(0.0, 1.0)
}

/// The parsed lyrics plus the raw text they came from.
#[derive(Debug, Default)]
pub struct LyricState {
    pub lines: Timeline,
    raw: String,
    pub version: u64,
}

impl LyricState {
    /// Re-parse only when the raw text differs. Returns true on replacement.
    pub fn replace_if_changed(&mut self, raw: &str) -> bool {
        if raw == self.raw && self.version > 0 {
            return false;
        }
        self.lines = Arc::new(parse_synced_lyrics(raw));
        self.raw = raw.to_string();
        self.version += 1;
        true
    }

    pub fn clear(&mut self) {
        if self.lines.is_empty() && self.raw.is_empty() {
            return;
        }
        self.lines = Arc::new(Vec::new());
        self.raw.clear();
        self.version += 1;
    }
}

/// Bundles all engine state. Owned by the task loop; every mutation goes
/// through it in order.
pub struct StateBundle {
    pub lyric_state: LyricState,
    pub reconciler: Reconciler,
    pub seek: SeekController,
    pub song_name: String,
    pub poll_failures: u32,
    pub loaded: bool,
    notice: Option<(String, Instant)>,
    window_before: usize,
    window_after: usize,
}

impl StateBundle {
    pub fn new(now: Instant, cfg: &EngineConfig) -> Self {
        Self {
            lyric_state: LyricState::default(),
            reconciler: Reconciler::new(now, cfg.drift_tolerance, cfg.seek_settle),
            seek: SeekController::new(),
            song_name: String::new(),
            poll_failures: 0,
            loaded: false,
            notice: None,
            window_before: cfg.window_before,
            window_after: cfg.window_after,
        }
    }

    pub fn availability(&self) -> Availability {
        if !self.loaded {
            Availability::Loading
        } else if self.reconciler.last_snapshot().is_none() {
            Availability::NoPlayback
        } else {
            Availability::Active
        }
    }

    /// Position to display: the gesture's pending position while dragging,
    /// otherwise the reconciled clock.
    pub fn display_position(&self, now: Instant) -> f64 {
        self.seek
            .pending_position()
            .unwrap_or_else(|| self.reconciler.current_position(now))
    }

    pub fn set_notice(&mut self, message: impl Into<String>, now: Instant) {
        self.notice = Some((message.into(), now + NOTICE_TTL));
    }

    pub fn notice(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|(_, until)| now < *until)
            .map(|(msg, _)| msg.as_str())
    }

    pub fn build_update(&self, now: Instant) -> Update {
        let position = self.display_position(now);
        let lines = &self.lyric_state.lines;
        let res = resolve(lines, position, self.window_before, self.window_after);
        let window = res
            .window
            .clone()
            .map(|index| ViewLine {
                index,
                text: lines[index].text.clone(),
                is_current: res.current == Some(index),
            })
            .collect();
        let duration = self.reconciler.duration();
        Update {
            availability: self.availability(),
            timeline: lines.clone(),
            timeline_version: self.lyric_state.version,
            lines: window,
            current: res.current,
            position,
            duration,
            progress: progress_fraction(position, duration),
            status: self.reconciler.status(),
            speed: self.reconciler.speed(),
            song_id: self.reconciler.song_id(),
            song_name: self.song_name.clone(),
            dragging: self.seek.is_dragging(),
            notice: self.notice(now).map(str::to_string),
            stale: self.poll_failures >= STALE_AFTER_FAILURES,
        }
    }
}
