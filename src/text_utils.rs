// src/text_utils.rs
// Utility functions for text formatting

use unicode_segmentation::UnicodeSegmentation;

/// Cut `text` to at most `width` graphemes, marking the cut with `~`.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.graphemes(true).count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.graphemes(true).take(width - 1).collect();
    out.push('~');
    out
}

/// Wrap text to a given width, breaking at word boundaries. Always yields at
/// least one (possibly empty) line so every lyric keeps its slot.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let wrapped: Vec<String> = textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|line| line.into_owned())
        .collect();
    if wrapped.is_empty() { vec![String::new()] } else { wrapped }
}

/// `m:ss` for seconds; negative and non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_by_grapheme() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdef", 4), "abc~");
        assert_eq!(truncate_to_width("e\u{301}e\u{301}e\u{301}", 2), "e\u{301}~");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn wraps_on_words() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(-4.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
