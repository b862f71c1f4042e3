// lyrics/mod.rs - lyric timeline parsing and resolution
pub mod parse;
pub mod resolve;
pub mod types;

pub use parse::parse_synced_lyrics;
pub use resolve::resolve;
pub use types::Timeline;
