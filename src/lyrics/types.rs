use std::sync::Arc;
use thiserror::Error;

/// One timed lyric line. `time` is in seconds from the start of the song.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricLine {
    pub time: f64,
    pub text: String,
}

/// Parsed, time-ordered lyric lines. Cheap to clone; never mutated after
/// the parser hands it out.
pub type Timeline = Arc<Vec<LyricLine>>;

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("lyrics are not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}
