use std::time::Instant;

/// Anchored playback clock: a known position at a known instant, advanced
/// by elapsed wall time times the speed multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTimer {
    /// Anchor position in seconds (finite, >= 0).
    anchor_position: f64,
    /// Monotonic instant corresponding to `anchor_position`.
    anchor_instant: Instant,
    /// Playback speed multiplier (finite, > 0).
    speed: f64,
}

impl PlaybackTimer {
    pub fn new(now: Instant) -> Self {
        Self {
            anchor_position: 0.0,
            anchor_instant: now,
            speed: 1.0,
        }
    }

    /// Re-anchor at `position` as observed at `now`.
    pub fn set_position(&mut self, position: f64, now: Instant) {
        self.anchor_position = sanitize_position(position);
        self.anchor_instant = now;
    }

    /// Change speed without moving the current estimate: the elapsed time
    /// at the old speed is folded into the anchor first.
    pub fn set_speed(&mut self, speed: f64, now: Instant, playing: bool) {
        let position = self.estimate_at(now, playing);
        self.set_position(position, now);
        self.speed = sanitize_speed(speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Estimated position at `now`. Frozen at the anchor unless playing.
    /// A `now` earlier than the anchor counts as zero elapsed time.
    pub fn estimate_at(&self, now: Instant, playing: bool) -> f64 {
        let base = self.anchor_position;
        if !playing {
            return base;
        }
        let elapsed = now.saturating_duration_since(self.anchor_instant).as_secs_f64();
        let val = base + elapsed * self.speed;
        if val.is_finite() { val } else { base }
    }
}

pub fn sanitize_position(p: f64) -> f64 {
    if p.is_nan() || !p.is_finite() || p < 0.0 {
        0.0
    } else {
        p
    }
}

/// Speeds must be positive; anything else is treated as normal speed.
pub fn sanitize_speed(s: f64) -> f64 {
    if s.is_finite() && s > 0.0 { s } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn extrapolates_with_speed() {
        let t0 = Instant::now();
        let mut timer = PlaybackTimer::new(t0);
        timer.set_position(10.0, t0);
        timer.set_speed(2.0, t0, true);
        let t1 = t0 + Duration::from_secs(1);
        assert!((timer.estimate_at(t1, true) - 12.0).abs() < 1e-9);
        assert!((timer.estimate_at(t1, false) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn speed_change_keeps_position_continuous() {
        let t0 = Instant::now();
        let mut timer = PlaybackTimer::new(t0);
        timer.set_position(5.0, t0);
        let t1 = t0 + Duration::from_secs(2);
        timer.set_speed(3.0, t1, true);
        assert!((timer.estimate_at(t1, true) - 7.0).abs() < 1e-9);
        let t2 = t1 + Duration::from_secs(1);
        assert!((timer.estimate_at(t2, true) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn instants_before_the_anchor_do_not_rewind() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let mut timer = PlaybackTimer::new(t0);
        timer.set_position(3.0, t1);
        assert!((timer.estimate_at(t0, true) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn sanitizes_bad_inputs() {
        assert_eq!(sanitize_position(f64::NAN), 0.0);
        assert_eq!(sanitize_position(-4.0), 0.0);
        assert_eq!(sanitize_position(f64::INFINITY), 0.0);
        assert_eq!(sanitize_speed(0.0), 1.0);
        assert_eq!(sanitize_speed(-2.0), 1.0);
        assert_eq!(sanitize_speed(1.5), 1.5);
    }
}
