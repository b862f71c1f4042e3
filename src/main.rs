mod event;
mod lyrics;
mod pool;
mod reconcile;
mod remote;
mod seek;
mod state;
mod text_utils;
mod timer;
mod ui;

use crate::pool::EngineConfig;
use crate::reconcile::SongId;
use crate::remote::HttpRemote;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Base URL of the player server
    #[arg(long, env = "LYRICSYNC_SERVER", default_value = "http://127.0.0.1:8080")]
    pub server: String,
    /// How often to fetch the remote playback state
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,
    /// How often the display is refreshed from the local clock
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub tick_interval_ms: u64,
    /// Lyric lines shown before and after the current one
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub window: usize,
    /// Lag below which a snapshot never pulls the display backward
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub drift_tolerance_ms: u64,
    /// How long stale snapshots are ignored after a local seek or command
    #[arg(long, value_name = "MS", default_value_t = 1500)]
    pub seek_settle_ms: u64,
    /// Position (seconds) committed when playback is stopped
    #[arg(long, value_name = "SECONDS", default_value_t = 1.0)]
    pub reset_position: f64,
    /// Increment used by the speed up/down keys (a whole number)
    #[arg(long, default_value_t = 1.0)]
    pub speed_step: f64,
    /// Pipe current lyric line to stdout (default is modern UI)
    #[arg(long)]
    pub pipe: bool,
    /// Enable backend logging to stderr
    #[arg(long)]
    pub debug_log: bool,
    /// List songs whose lyrics contain TEXT and exit
    #[arg(long, value_name = "TEXT", conflicts_with = "play")]
    pub search: Option<String>,
    /// Start playing a song on the server before attaching
    #[arg(long, value_name = "SONG_ID")]
    pub play: Option<u64>,
    /// Parse a local LRC file, print its timeline and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["search", "play"])]
    pub check: Option<PathBuf>,
}

impl Config {
    fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        // The server stores speed as an unsigned integer.
        let speed_step = if self.speed_step.is_finite() && self.speed_step >= 1.0 && self.speed_step.fract() == 0.0 {
            self.speed_step
        } else {
            defaults.speed_step
        };
        let reset_position = if self.reset_position.is_finite() && self.reset_position >= 0.0 {
            self.reset_position
        } else {
            defaults.reset_position
        };
        EngineConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            window_before: self.window,
            window_after: self.window,
            drift_tolerance: Duration::from_millis(self.drift_tolerance_ms).as_secs_f64(),
            seek_settle: Duration::from_millis(self.seek_settle_ms),
            reset_position,
            speed_step,
        }
    }
}

/// Logs go to stderr and are off unless asked for, so the TUI stays clean.
fn init_tracing(debug_log: bool) {
    let default = if debug_log { "lyricsync=debug" } else { "off" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn print_search(remote: &HttpRemote, query: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let songs = remote.search_songs(query).await?;
    if songs.is_empty() {
        println!("No songs found");
    }
    for song in songs {
        println!(
            "{:>5}  {}  ({})",
            song.id.0,
            song.name,
            text_utils::format_time(song.duration)
        );
    }
    Ok(())
}

async fn print_timeline(path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    let raw = tokio::fs::read(path).await?;
    let lines = lyrics::parse::parse_synced_bytes(&raw)?;
    for line in &lines {
        println!("{:>9.3}  {}", line.time, line.text);
    }
    println!("{} timed lines", lines.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cfg = Config::parse();
    init_tracing(cfg.debug_log);
    let remote = HttpRemote::new(cfg.server.clone());
    let engine = cfg.engine_config();

    let result = if let Some(path) = &cfg.check {
        print_timeline(path).await
    } else if let Some(query) = &cfg.search {
        print_search(&remote, query).await
    } else {
        let started = match cfg.play {
            Some(id) => remote.start_song(SongId(id), engine.reset_position).await,
            None => Ok(()),
        };
        match started {
            Ok(()) if cfg.pipe => crate::ui::pipe::display_lyrics_pipe(Arc::new(remote), engine).await,
            Ok(()) => crate::ui::modern::display_lyrics_modern(Arc::new(remote), engine).await,
            Err(e) => Err(e.into()),
        }
    };

    // Print error if any, for better diagnostics
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }
    Ok(())
}
