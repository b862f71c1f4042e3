// pool.rs: Central task loop tying the poll task, the tick and user input together

use crate::event::{CommitRequest, Event, Input, PollOutcome, process_event};
use crate::remote::PlaybackRemote;
use crate::state::{StateBundle, Update};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub window_before: usize,
    pub window_after: usize,
    /// Seconds a snapshot may lag the running estimate without pulling the
    /// display backward.
    pub drift_tolerance: f64,
    pub seek_settle: Duration,
    /// Position committed on stop.
    pub reset_position: f64,
    pub speed_step: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            tick_interval: Duration::from_millis(100),
            window_before: 3,
            window_after: 3,
            drift_tolerance: 0.5,
            seek_settle: Duration::from_millis(1500),
            reset_position: 1.0,
            speed_step: 1.0,
        }
    }
}

/// Poll the remote on a fixed cadence and forward outcomes. Exits when the
/// engine stops listening.
async fn poll_remote<R: PlaybackRemote>(remote: Arc<R>, interval: Duration, event_tx: mpsc::Sender<Event>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let outcome = match remote.fetch_playback_state().await {
            Ok(Some(data)) => PollOutcome::Active(data, Instant::now()),
            Ok(None) => PollOutcome::Inactive,
            Err(e) => PollOutcome::Failed(e.to_string()),
        };
        if event_tx.send(Event::Poll(outcome)).await.is_err() {
            break;
        }
    }
}

/// Send a commit without waiting for it. The response comes back as an
/// event; if the engine is gone by then it is dropped.
fn spawn_commit<R: PlaybackRemote>(remote: &Arc<R>, req: CommitRequest, event_tx: &mpsc::Sender<Event>) {
    let remote = Arc::clone(remote);
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        let result = remote
            .commit_playback_state(req.command)
            .await
            .map_err(|e| e.to_string());
        let _ = event_tx.send(Event::CommitDone { kind: req.kind, result }).await;
    });
}

/// Push the current view model. Never waits: a full channel means the UI
/// is behind and will get the next tick. Returns false once the UI is gone.
fn send_update(state: &StateBundle, update_tx: &mpsc::Sender<Update>) -> bool {
    match update_tx.try_send(state.build_update(Instant::now())) {
        Ok(()) | Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Run the sync engine until `shutdown_rx` fires (or its sender is dropped),
/// the input channel closes, or the UI stops receiving updates.
pub async fn listen<R: PlaybackRemote>(
    remote: Arc<R>,
    update_tx: mpsc::Sender<Update>,
    mut input_rx: mpsc::Receiver<Input>,
    mut shutdown_rx: mpsc::Receiver<()>,
    cfg: EngineConfig,
) {
    let mut state = StateBundle::new(Instant::now(), &cfg);
    let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
    let poller = tokio::spawn(poll_remote(Arc::clone(&remote), cfg.poll_interval, event_tx.clone()));
    let mut ticker = tokio::time::interval(cfg.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => break,

            maybe_input = input_rx.recv() => {
                let Some(input) = maybe_input else { break };
                if let Some(req) = process_event(Event::Input(input), &mut state, &cfg, Instant::now()) {
                    spawn_commit(&remote, req, &event_tx);
                }
                if !send_update(&state, &update_tx) {
                    break;
                }
            }

            Some(event) = event_rx.recv() => {
                if let Some(req) = process_event(event, &mut state, &cfg, Instant::now()) {
                    spawn_commit(&remote, req, &event_tx);
                }
            }

            _ = ticker.tick() => {
                if !send_update(&state, &update_tx) {
                    break;
                }
            }
        }
    }
    poller.abort();
    tracing::debug!("sync engine stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{PlayStatus, SongId};
    use crate::remote::{PlaybackCommand, RemoteError, RemotePlayback};
    use crate::seek::DragSource;
    use crate::state::Availability;
    use std::sync::Mutex;

    struct FakeRemote {
        playback: Mutex<Option<RemotePlayback>>,
        commits: Mutex<Vec<PlaybackCommand>>,
        fail_commits: bool,
    }

    impl FakeRemote {
        fn new(playback: Option<RemotePlayback>) -> Arc<Self> {
            Arc::new(Self {
                playback: Mutex::new(playback),
                commits: Mutex::new(Vec::new()),
                fail_commits: false,
            })
        }

        fn commits(&self) -> Vec<PlaybackCommand> {
            self.commits.lock().unwrap().clone()
        }
    }

    impl PlaybackRemote for FakeRemote {
        async fn fetch_playback_state(&self) -> Result<Option<RemotePlayback>, RemoteError> {
            Ok(self.playback.lock().unwrap().clone())
        }

        async fn commit_playback_state(&self, cmd: PlaybackCommand) -> Result<(), RemoteError> {
            let cmd_song = cmd.song_id;
            self.commits.lock().unwrap().push(cmd);
            if self.fail_commits {
                return Err(RemoteError::UnknownSong(cmd_song));
            }
            Ok(())
        }
    }

    fn playback() -> RemotePlayback {
        RemotePlayback {
            name: "Song".into(),
            song_id: SongId(9),
            lyric: "[00:00.00]A\n[00:02.50]B\n[00:05.00]C".into(),
            duration: 120.0,
            progress: 3.0,
            speed: 1.0,
            is_playing: PlayStatus::Paused,
        }
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_millis(20),
            tick_interval: Duration::from_millis(10),
            ..EngineConfig::default()
        }
    }

    struct Harness {
        updates: mpsc::Receiver<Update>,
        inputs: mpsc::Sender<Input>,
        shutdown: mpsc::Sender<()>,
        engine: tokio::task::JoinHandle<()>,
    }

    fn start<R: PlaybackRemote>(remote: Arc<R>) -> Harness {
        let (update_tx, updates) = mpsc::channel(64);
        let (inputs, input_rx) = mpsc::channel(8);
        let (shutdown, shutdown_rx) = mpsc::channel(1);
        let engine = tokio::spawn(listen(remote, update_tx, input_rx, shutdown_rx, fast_config()));
        Harness { updates, inputs, shutdown, engine }
    }

    async fn wait_for(updates: &mut mpsc::Receiver<Update>, pred: impl Fn(&Update) -> bool) -> Update {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let upd = updates.recv().await.expect("engine stopped");
                if pred(&upd) {
                    return upd;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    #[tokio::test]
    async fn publishes_resolved_lines_from_polls() {
        let remote = FakeRemote::new(Some(playback()));
        let mut h = start(remote);
        let upd = wait_for(&mut h.updates, |u| u.availability == Availability::Active).await;
        assert_eq!(upd.current, Some(1));
        assert_eq!(upd.song_name, "Song");
        assert!((upd.progress - 0.025).abs() < 1e-9);
        h.shutdown.send(()).await.unwrap();
        h.engine.await.unwrap();
    }

    #[tokio::test]
    async fn reports_no_playback_when_remote_is_idle() {
        let remote = FakeRemote::new(None);
        let mut h = start(remote);
        let upd = wait_for(&mut h.updates, |u| u.availability != Availability::Loading).await;
        assert_eq!(upd.availability, Availability::NoPlayback);
        drop(h.shutdown);
        h.engine.await.unwrap();
    }

    #[tokio::test]
    async fn drag_release_commits_once_and_tap_does_not() {
        let remote = FakeRemote::new(Some(playback()));
        let mut h = start(Arc::clone(&remote));
        wait_for(&mut h.updates, |u| u.availability == Availability::Active).await;

        h.inputs.send(Input::DragStart(DragSource::LyricList)).await.unwrap();
        h.inputs.send(Input::DragEnd).await.unwrap();

        h.inputs.send(Input::DragStart(DragSource::ProgressBar)).await.unwrap();
        h.inputs.send(Input::DragTo(60.0)).await.unwrap();
        wait_for(&mut h.updates, |u| u.dragging && u.position == 60.0).await;
        h.inputs.send(Input::DragEnd).await.unwrap();

        // Polls keep reporting 3.0; the display must stay on the seek target.
        let upd = wait_for(&mut h.updates, |u| !u.dragging).await;
        assert_eq!(upd.position, 60.0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let commits = remote.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].progress, 60.0);
        assert_eq!(commits[0].song_id, SongId(9));
        assert_eq!(commits[0].is_playing, PlayStatus::Paused);

        h.shutdown.send(()).await.unwrap();
        h.engine.await.unwrap();
    }

    #[tokio::test]
    async fn failed_commit_surfaces_a_notice() {
        let remote = Arc::new(FakeRemote {
            playback: Mutex::new(Some(playback())),
            commits: Mutex::new(Vec::new()),
            fail_commits: true,
        });
        let mut h = start(remote);
        wait_for(&mut h.updates, |u| u.availability == Availability::Active).await;
        h.inputs.send(Input::TogglePlay).await.unwrap();
        let upd = wait_for(&mut h.updates, |u| u.notice.is_some()).await;
        assert_eq!(upd.status, PlayStatus::Playing);
        h.shutdown.send(()).await.unwrap();
        h.engine.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_ui_goes_away() {
        let remote = FakeRemote::new(Some(playback()));
        let h = start(remote);
        drop(h.updates);
        tokio::time::timeout(Duration::from_secs(5), h.engine)
            .await
            .expect("engine did not stop")
            .unwrap();
        drop(h.shutdown);
    }
}
