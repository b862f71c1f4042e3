use crate::lyrics::types::{LyricLine, LyricsError};
use once_cell::sync::Lazy;
use regex::Regex;

static SYNCED_LYRICS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+):(\d+)\.(\d{2,3})\]").unwrap());

/// Parse LRC text into lyric lines sorted by time.
///
/// Only the first timestamp tag on a line is used. Lines without a tag
/// (metadata such as `[ar:...]`, blank lines, garbage) are skipped. An
/// empty text after the tag is kept: it marks an instrumental gap.
pub fn parse_synced_lyrics(synced: &str) -> Vec<LyricLine> {
    let re = &SYNCED_LYRICS_RE;
    let mut lines: Vec<LyricLine> = synced
        .lines()
        .filter_map(|line| {
            let cap = re.captures(line)?;
            let min = cap.get(1)?.as_str().parse::<u32>().ok()?;
            let sec = cap.get(2)?.as_str().parse::<u32>().ok()?;
            let frac = cap.get(3)?.as_str();
            let divisor = 10f64.powi(frac.len() as i32);
            let frac = frac.parse::<u32>().ok()? as f64 / divisor;
            let time = min as f64 * 60.0 + sec as f64 + frac;
            let text = re.replace(line, "").trim().to_string();
            Some(LyricLine { time, text })
        })
        .collect();
    // `sort_by` is stable, so lines sharing a timestamp keep file order.
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

/// Parse LRC content that arrived as raw bytes.
pub fn parse_synced_bytes(raw: &[u8]) -> Result<Vec<LyricLine>, LyricsError> {
    let text = std::str::from_utf8(raw)?;
    Ok(parse_synced_lyrics(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_centiseconds_and_milliseconds() {
        let lines = parse_synced_lyrics("[00:01.12]first\n[01:10.254]second");
        assert_eq!(lines.len(), 2);
        assert!((lines[0].time - 1.12).abs() < 1e-9);
        assert!((lines[1].time - 70.254).abs() < 1e-9);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].text, "second");
    }

    #[test]
    fn drops_metadata_and_untagged_lines() {
        let content = "[ti:Test Song]\n[ar:Someone]\nplain text\n[00:05.00]Hello\n[0x:00.00]bad";
        let lines = parse_synced_lyrics(content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn keeps_empty_text_for_instrumental_gaps() {
        let lines = parse_synced_lyrics("[00:10.00]\n[00:12.00]  words  ");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "");
        assert_eq!(lines[1].text, "words");
    }

    #[test]
    fn sorts_ascending_and_keeps_tie_order() {
        let content = "[00:05.00]C\n[00:01.00]A\n[00:05.00]D\n[00:02.50]B";
        let lines = parse_synced_lyrics(content);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C", "D"]);
    }

    #[test]
    fn seconds_are_not_range_checked() {
        let lines = parse_synced_lyrics("[00:75.00]late");
        assert_eq!(lines.len(), 1);
        assert!((lines[0].time - 75.0).abs() < 1e-9);
    }

    #[test]
    fn parsing_is_deterministic() {
        let content = "[00:03.00]x\n[00:01.00]y\nnoise\n[00:02.000]z";
        assert_eq!(parse_synced_lyrics(content), parse_synced_lyrics(content));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let lines = parse_synced_lyrics("[00:01.00]one\r\n[00:02.00]two\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "two");
    }

    #[test]
    fn rejects_non_utf8_bytes() {
        assert!(parse_synced_bytes(&[0xff, 0xfe, b'[']).is_err());
        let ok = parse_synced_bytes(b"[00:01.00]ok").unwrap();
        assert_eq!(ok[0].text, "ok");
    }
}
