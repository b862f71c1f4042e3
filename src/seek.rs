//! Seek/drag state machine.
//!
//! `Idle → Dragging → Committing → Idle`. While a drag is active the
//! controller owns the displayed position; on release a moved drag becomes a
//! numbered commit and a tap returns straight to idle. Commit responses are
//! matched by sequence number so a late response for a superseded commit is
//! ignored.

use thiserror::Error;

/// Where a drag gesture started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSource {
    LyricList,
    ProgressBar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub source: DragSource,
    pub start_position: f64,
    pub pending_position: f64,
}

impl DragSession {
    fn moved(&self) -> bool {
        self.pending_position != self.start_position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SeekPhase {
    #[default]
    Idle,
    Dragging(DragSession),
    Committing { seq: u64, target: f64 },
}

/// A seek that must be sent to the remote player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekCommit {
    pub seq: u64,
    pub source: DragSource,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// Released without moving: no remote command.
    Tap,
    Commit(SeekCommit),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekError {
    #[error("a drag is already in progress")]
    AlreadyDragging,
    #[error("no drag in progress")]
    NotDragging,
}

#[derive(Debug, Default)]
pub struct SeekController {
    phase: SeekPhase,
    next_seq: u64,
}

impl SeekController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SeekPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, SeekPhase::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, SeekPhase::Dragging(_))
    }

    /// Start a drag at `start_position`. Starting over an in-flight commit
    /// supersedes it; its response will be discarded as stale.
    pub fn begin_drag(&mut self, source: DragSource, start_position: f64) -> Result<(), SeekError> {
        if self.is_dragging() {
            return Err(SeekError::AlreadyDragging);
        }
        self.phase = SeekPhase::Dragging(DragSession {
            source,
            start_position,
            pending_position: start_position,
        });
        Ok(())
    }

    /// Move the pending position; `clamp` bounds it to the playable range.
    pub fn update_drag(&mut self, position: f64, clamp: impl Fn(f64) -> f64) -> Result<f64, SeekError> {
        match &mut self.phase {
            SeekPhase::Dragging(session) => {
                session.pending_position = clamp(position);
                Ok(session.pending_position)
            }
            _ => Err(SeekError::NotDragging),
        }
    }

    pub fn end_drag(&mut self) -> Result<DragOutcome, SeekError> {
        let SeekPhase::Dragging(session) = self.phase else {
            return Err(SeekError::NotDragging);
        };
        if !session.moved() {
            self.phase = SeekPhase::Idle;
            return Ok(DragOutcome::Tap);
        }
        self.next_seq += 1;
        let commit = SeekCommit {
            seq: self.next_seq,
            source: session.source,
            target: session.pending_position,
        };
        self.phase = SeekPhase::Committing {
            seq: commit.seq,
            target: commit.target,
        };
        Ok(DragOutcome::Commit(commit))
    }

    /// Finish the commit numbered `seq`. Returns the committed target, or
    /// `None` when the response is stale.
    pub fn complete_commit(&mut self, seq: u64) -> Option<f64> {
        match self.phase {
            SeekPhase::Committing { seq: current, target } if current == seq => {
                self.phase = SeekPhase::Idle;
                Some(target)
            }
            _ => None,
        }
    }

    /// Drop any drag or in-flight commit without committing. A pending
    /// commit response becomes stale. Returns true if anything was dropped.
    pub fn cancel(&mut self) -> bool {
        let was_idle = self.is_idle();
        self.phase = SeekPhase::Idle;
        !was_idle
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            SeekPhase::Dragging(session) => Some(session),
            _ => None,
        }
    }

    /// Position owned by the active gesture, if any.
    pub fn pending_position(&self) -> Option<f64> {
        self.session().map(|s| s.pending_position)
    }
}
