use crate::pool::{self, EngineConfig};
use crate::reconcile::SongId;
use crate::remote::PlaybackRemote;
use crate::state::{Availability, Update};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity of the last printed line: song, timeline version, line index.
type PrintedLine = (Option<SongId>, u64, usize);

/// The text to print for `upd`, if its current line differs from the last
/// one printed. Seeks and song changes count as changes.
fn next_line(last: &mut Option<PrintedLine>, upd: &Update) -> Option<String> {
    if upd.availability != Availability::Active {
        return None;
    }
    let idx = upd.current?;
    let key = (upd.song_id, upd.timeline_version, idx);
    if *last == Some(key) {
        return None;
    }
    *last = Some(key);
    upd.timeline.get(idx).map(|line| line.text.clone())
}

/// Display lyrics in pipe mode (stdout only, for scripting)
pub async fn display_lyrics_pipe<R: PlaybackRemote>(
    remote: Arc<R>,
    cfg: EngineConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (tx, mut rx) = mpsc::channel(32);
    // Pipe mode sends no input, but the engine stops when this sender drops.
    let (_input_tx, input_rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let engine = tokio::spawn(pool::listen(remote, tx, input_rx, shutdown_rx, cfg));

    let mut last: Option<PrintedLine> = None;
    loop {
        tokio::select! {
            maybe_update = rx.recv() => {
                let Some(upd) = maybe_update else { break };
                if let Some(text) = next_line(&mut last, &upd) {
                    println!("{}", text);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = shutdown_tx.send(()).await;
                break;
            }
        }
    }
    engine.await?;
    Ok(())
}
