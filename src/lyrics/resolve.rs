//! Position → line resolution.

use crate::lyrics::types::LyricLine;
use std::ops::Range;

/// Result of resolving a playback position against a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Last line whose timestamp is at or before the position.
    pub current: Option<usize>,
    /// Indices to render around `current`, clipped to the timeline.
    pub window: Range<usize>,
}

/// Index of the last line with `time <= position`, or `None` when the
/// position precedes the first line, is NaN, or there are no lines.
pub fn current_index(lines: &[LyricLine], position: f64) -> Option<usize> {
    if position.is_nan() {
        return None;
    }
    // Lines are sorted by time, so the predicate is monotone.
    match lines.partition_point(|line| line.time <= position) {
        0 => None,
        n => Some(n - 1),
    }
}

/// Resolve `position` to the current line plus `before`/`after` lines of
/// context. Before the first line the window shows the upcoming lines.
pub fn resolve(lines: &[LyricLine], position: f64, before: usize, after: usize) -> Resolution {
    let current = current_index(lines, position);
    let window = match current {
        Some(idx) => idx.saturating_sub(before)..(idx + after + 1).min(lines.len()),
        None => 0..after.min(lines.len()),
    };
    Resolution { current, window }
}

/// Timestamp of the line `offset` lines away from the one active at
/// `position`, clamped to the timeline. Used for line-wise scrubbing.
pub fn line_time_at_offset(lines: &[LyricLine], position: f64, offset: i64) -> Option<f64> {
    let last = lines.len().checked_sub(1)?;
    let base = match current_index(lines, position) {
        Some(idx) => idx as i64,
        // Before the first line, one step forward lands on line 0.
        None => -1,
    };
    let target = (base + offset).clamp(0, last as i64) as usize;
    Some(lines[target].time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> Vec<LyricLine> {
        vec![
            LyricLine { time: 0.0, text: "A".into() },
            LyricLine { time: 2.5, text: "B".into() },
            LyricLine { time: 5.0, text: "C".into() },
        ]
    }

    #[test]
    fn resolves_inside_and_on_boundaries() {
        let lines = timeline();
        assert_eq!(current_index(&lines, 3.0), Some(1));
        assert_eq!(current_index(&lines, 0.0), Some(0));
        assert_eq!(current_index(&lines, 2.5), Some(1));
        assert_eq!(current_index(&lines, 100.0), Some(2));
    }

    #[test]
    fn before_first_line_or_empty_is_none() {
        let lines = timeline();
        assert_eq!(current_index(&lines, -f64::EPSILON), None);
        assert_eq!(current_index(&[], 3.0), None);
        assert_eq!(current_index(&lines, f64::NAN), None);
    }

    #[test]
    fn duplicate_timestamps_resolve_to_last_of_group() {
        let mut lines = timeline();
        lines.insert(2, LyricLine { time: 2.5, text: "B2".into() });
        assert_eq!(current_index(&lines, 2.5), Some(2));
    }

    #[test]
    fn window_is_clipped_to_the_timeline() {
        let lines = timeline();
        let res = resolve(&lines, 0.1, 3, 3);
        assert_eq!(res.current, Some(0));
        assert_eq!(res.window, 0..3);

        let res = resolve(&lines, 3.0, 1, 0);
        assert_eq!(res.window, 0..2);

        let res = resolve(&[], 3.0, 3, 3);
        assert_eq!(res, Resolution { current: None, window: 0..0 });
    }

    #[test]
    fn window_before_first_line_shows_upcoming() {
        let lines = vec![
            LyricLine { time: 4.0, text: "x".into() },
            LyricLine { time: 6.0, text: "y".into() },
        ];
        let res = resolve(&lines, 1.0, 3, 1);
        assert_eq!(res.current, None);
        assert_eq!(res.window, 0..1);
    }

    #[test]
    fn resolve_is_idempotent() {
        let lines = timeline();
        assert_eq!(resolve(&lines, 4.2, 2, 2), resolve(&lines, 4.2, 2, 2));
    }

    #[test]
    fn line_offsets_clamp_to_ends() {
        let lines = timeline();
        assert_eq!(line_time_at_offset(&lines, 3.0, 1), Some(5.0));
        assert_eq!(line_time_at_offset(&lines, 3.0, -5), Some(0.0));
        assert_eq!(line_time_at_offset(&lines, 3.0, 9), Some(5.0));
        assert_eq!(line_time_at_offset(&[], 3.0, 1), None);
    }
}
