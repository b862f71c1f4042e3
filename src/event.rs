//! Event processing: every state mutation (poll results, user input,
//! commit responses) is funneled through `process_event` in arrival order.
//! Processing never performs I/O; remote commits come back as
//! [`CommitRequest`]s for the task loop to send.

use crate::lyrics::resolve::line_time_at_offset;
use crate::pool::EngineConfig;
use crate::reconcile::{PlayStatus, SnapshotEffect};
use crate::remote::{PlaybackCommand, RemotePlayback};
use crate::seek::{DragOutcome, DragSource};
use crate::state::{Availability, STALE_AFTER_FAILURES, StateBundle};
use std::time::Instant;

/// Upper bound for locally requested speed changes.
pub const MAX_SPEED: f64 = 8.0;

#[derive(Debug, Clone)]
pub enum PollOutcome {
    Active(RemotePlayback, Instant),
    /// The remote says nothing is playing.
    Inactive,
    Failed(String),
}

/// User gestures and transport commands from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    DragStart(DragSource),
    /// Absolute pending position in seconds.
    DragTo(f64),
    /// Relative move in seconds.
    DragBy(f64),
    /// Move to the line `n` lines away from the pending one.
    DragLines(i64),
    DragEnd,
    /// Abandon the gesture without seeking.
    DragCancel,
    TogglePlay,
    Stop,
    ChangeSpeed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Seek(u64),
    Transport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub kind: CommitKind,
    pub command: PlaybackCommand,
}

#[derive(Debug)]
pub enum Event {
    Poll(PollOutcome),
    Input(Input),
    CommitDone {
        kind: CommitKind,
        result: Result<(), String>,
    },
}

pub fn process_event(
    event: Event,
    state: &mut StateBundle,
    cfg: &EngineConfig,
    now: Instant,
) -> Option<CommitRequest> {
    match event {
        Event::Poll(outcome) => {
            handle_poll(outcome, state, now);
            None
        }
        Event::Input(input) => handle_input(input, state, cfg, now),
        Event::CommitDone { kind, result } => {
            handle_commit_done(kind, result, state, now);
            None
        }
    }
}

fn handle_poll(outcome: PollOutcome, state: &mut StateBundle, now: Instant) {
    state.loaded = true;
    match outcome {
        PollOutcome::Active(data, received_at) => {
            if state.poll_failures >= STALE_AFTER_FAILURES {
                tracing::info!(failures = state.poll_failures, "playback polling recovered");
            }
            state.poll_failures = 0;
            state.song_name = data.name.clone();
            if state.lyric_state.replace_if_changed(&data.lyric) {
                tracing::info!(
                    song = %data.song_id,
                    lines = state.lyric_state.lines.len(),
                    version = state.lyric_state.version,
                    "timeline replaced"
                );
            }
            let hold = !state.seek.is_idle();
            match state.reconciler.on_snapshot(data.to_snapshot(received_at), now, hold) {
                SnapshotEffect::Corrected(c) => {
                    tracing::debug!(from = c.from, to = c.to, "drift correction");
                }
                SnapshotEffect::Suppressed => {
                    tracing::debug!(
                        position = data.progress,
                        settling = state.reconciler.is_settling(now),
                        "snapshot suppressed"
                    );
                }
                SnapshotEffect::Applied | SnapshotEffect::Held => {}
            }
        }
        PollOutcome::Inactive => {
            state.poll_failures = 0;
            if state.seek.cancel() {
                tracing::debug!("gesture dropped: playback ended");
            }
            if state.reconciler.last_snapshot().is_some() {
                tracing::info!("remote reports no active playback");
            }
            state.reconciler.clear(now);
            state.lyric_state.clear();
            state.song_name.clear();
        }
        PollOutcome::Failed(err) => {
            // Keep extrapolating from the last anchor.
            state.poll_failures += 1;
            if state.poll_failures == STALE_AFTER_FAILURES {
                tracing::warn!(failures = state.poll_failures, error = %err, "playback polling keeps failing");
            } else {
                tracing::debug!(error = %err, "poll failed");
            }
        }
    }
}

fn handle_input(
    input: Input,
    state: &mut StateBundle,
    cfg: &EngineConfig,
    now: Instant,
) -> Option<CommitRequest> {
    if state.availability() != Availability::Active {
        // Releases still close the gesture; nothing is left to seek in.
        if matches!(input, Input::DragEnd | Input::DragCancel) {
            state.seek.cancel();
        }
        tracing::debug!(?input, "input ignored without active playback");
        return None;
    }
    match input {
        Input::DragStart(source) => {
            let start = state.display_position(now);
            if let Err(e) = state.seek.begin_drag(source, start) {
                tracing::debug!(error = %e, phase = ?state.seek.phase(), "drag start ignored");
            }
            None
        }
        Input::DragTo(position) => {
            update_drag(state, position);
            None
        }
        Input::DragBy(delta) => {
            if let Some(pending) = state.seek.pending_position() {
                update_drag(state, pending + delta);
            }
            None
        }
        Input::DragLines(offset) => {
            if let Some(pending) = state.seek.pending_position()
                && let Some(target) = line_time_at_offset(&state.lyric_state.lines, pending, offset)
            {
                update_drag(state, target);
            }
            None
        }
        Input::DragEnd => end_drag(state, now),
        Input::DragCancel => {
            if state.seek.is_dragging() {
                state.seek.cancel();
                tracing::debug!("drag cancelled");
            }
            None
        }
        Input::TogglePlay => {
            let status = match state.reconciler.status() {
                PlayStatus::Playing => PlayStatus::Paused,
                PlayStatus::Paused | PlayStatus::Stopped => PlayStatus::Playing,
            };
            state.reconciler.set_status(status, now);
            transport_commit(state, now)
        }
        Input::Stop => {
            state.reconciler.set_status(PlayStatus::Stopped, now);
            state.reconciler.seek_to(cfg.reset_position, now);
            state.reconciler.set_speed(1.0, now);
            transport_commit(state, now)
        }
        Input::ChangeSpeed(delta) => {
            let min = cfg.speed_step.min(MAX_SPEED);
            let speed = (state.reconciler.speed() + delta).clamp(min, MAX_SPEED);
            if speed == state.reconciler.speed() {
                return None;
            }
            state.reconciler.set_speed(speed, now);
            transport_commit(state, now)
        }
    }
}

fn update_drag(state: &mut StateBundle, position: f64) {
    let reconciler = &state.reconciler;
    if let Err(e) = state.seek.update_drag(position, |p| reconciler.clamp(p)) {
        tracing::debug!(error = %e, "drag update ignored");
    }
}

fn end_drag(state: &mut StateBundle, now: Instant) -> Option<CommitRequest> {
    let commit = match state.seek.end_drag() {
        Ok(DragOutcome::Tap) => return None,
        Ok(DragOutcome::Commit(commit)) => commit,
        Err(e) => {
            tracing::debug!(error = %e, "drag end ignored");
            return None;
        }
    };
    // Show the target right away; the remote catches up later.
    state.reconciler.seek_to(commit.target, now);
    let Some(song_id) = state.reconciler.song_id() else {
        state.seek.complete_commit(commit.seq);
        return None;
    };
    tracing::info!(seq = commit.seq, source = ?commit.source, target = commit.target, "committing seek");
    Some(CommitRequest {
        kind: CommitKind::Seek(commit.seq),
        command: PlaybackCommand {
            song_id,
            progress: commit.target,
            speed: state.reconciler.speed(),
            is_playing: state.reconciler.status(),
        },
    })
}

fn transport_commit(state: &mut StateBundle, now: Instant) -> Option<CommitRequest> {
    let song_id = state.reconciler.song_id()?;
    state.reconciler.begin_settle(now);
    let command = PlaybackCommand {
        song_id,
        progress: state.reconciler.current_position(now),
        speed: state.reconciler.speed(),
        is_playing: state.reconciler.status(),
    };
    tracing::info!(status = %command.is_playing, speed = command.speed, "committing transport change");
    Some(CommitRequest {
        kind: CommitKind::Transport,
        command,
    })
}

fn handle_commit_done(kind: CommitKind, result: Result<(), String>, state: &mut StateBundle, now: Instant) {
    match kind {
        CommitKind::Seek(seq) => {
            if state.seek.complete_commit(seq).is_none() {
                tracing::debug!(seq, "stale seek response discarded");
                return;
            }
            // The anchor already sits on the target; keep stale polls off it.
            state.reconciler.begin_settle(now);
            if let Err(e) = result {
                tracing::warn!(seq, error = %e, "seek commit failed");
                state.set_notice(format!("Seek failed: {e}"), now);
            }
        }
        CommitKind::Transport => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "transport commit failed");
                state.set_notice(format!("Command failed: {e}"), now);
            }
        }
    }
}
