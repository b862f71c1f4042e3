//! Full-screen terminal UI.
//!
//! Renders the engine's view model (header, centered lyric window, progress
//! gauge) and turns keys and mouse gestures into engine [`Input`]s:
//! dragging the lyric list scrubs line by line, dragging the progress bar
//! scrubs by fraction of the song, and releasing commits the seek. Arrow
//! keys scrub too: Enter commits, Backspace abandons.

use crate::event::Input;
use crate::pool::{self, EngineConfig};
use crate::remote::PlaybackRemote;
use crate::seek::DragSource;
use crate::state::Update;
use crate::ui::modern_helpers::{ScreenLayout, WrapCache, bar_fraction, draw_ui};
use crate::ui::styles::LyricStyles;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::layout::Position;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

/// Seconds moved by one press of the left/right keys.
const KEY_SCRUB_SECONDS: f64 = 5.0;

/// Mouse gesture in progress, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MouseGesture {
    /// Row the lyric list was last dragged to.
    Lyrics { last_row: u16 },
    Progress,
}

/// UI state for the modern TUI mode
pub struct ModernUIState {
    pub last_update: Option<Update>,
    pub wrapped_cache: Option<WrapCache>,
    pub layout: ScreenLayout,
    pub should_exit: bool,
    gesture: Option<MouseGesture>,
    speed_step: f64,
}

impl ModernUIState {
    pub fn new(speed_step: f64) -> Self {
        Self {
            last_update: None,
            wrapped_cache: None,
            layout: ScreenLayout::default(),
            should_exit: false,
            gesture: None,
            speed_step,
        }
    }

    fn duration(&self) -> f64 {
        self.last_update.as_ref().map_or(0.0, |u| u.duration)
    }
}

/// Display lyrics in modern TUI mode (centered, highlighted, real-time)
pub async fn display_lyrics_modern<R: PlaybackRemote>(
    remote: Arc<R>,
    cfg: EngineConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (update_tx, update_rx) = mpsc::channel(32);
    let (input_tx, input_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let state = ModernUIState::new(cfg.speed_step);
    let engine = tokio::spawn(pool::listen(remote, update_tx, input_rx, shutdown_rx, cfg));

    enable_raw_mode().map_err(to_boxed_err)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(to_boxed_err)?;
    let result = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(mut terminal) => run(&mut terminal, state, update_rx, input_tx).await,
        Err(e) => Err(to_boxed_err(e)),
    };

    // Restore the terminal even when the loop failed.
    let _ = shutdown_tx.send(()).await;
    disable_raw_mode().map_err(to_boxed_err)?;
    execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen).map_err(to_boxed_err)?;
    engine.await?;
    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut state: ModernUIState,
    mut update_rx: mpsc::Receiver<Update>,
    input_tx: mpsc::Sender<Input>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let styles = LyricStyles::default();
    // Single background thread to poll for crossterm events and forward them
    // to the async runtime. Exits once the receiver is dropped.
    let (event_tx, mut event_rx) = mpsc::channel(32);
    thread::spawn(move || {
        loop {
            match crossterm::event::poll(Duration::from_millis(100)) {
                Ok(true) => match crossterm::event::read() {
                    Ok(ev) => {
                        if event_tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => {}
                },
                Ok(false) => {
                    if event_tx.is_closed() {
                        break;
                    }
                }
                Err(_) => thread::sleep(Duration::from_millis(100)),
            }
        }
    });

    redraw(terminal, &mut state, &styles)?;
    while !state.should_exit {
        tokio::select! {
            biased;

            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else { break };
                for input in handle_terminal_event(event, &mut state) {
                    if input_tx.send(input).await.is_err() {
                        state.should_exit = true;
                        break;
                    }
                }
                redraw(terminal, &mut state, &styles)?;
            }

            maybe_update = update_rx.recv() => {
                let Some(update) = maybe_update else { break };
                state.last_update = Some(update);
                redraw(terminal, &mut state, &styles)?;
            }
        }
    }
    Ok(())
}

fn redraw(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state: &mut ModernUIState,
    styles: &LyricStyles,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut layout = state.layout;
    terminal
        .draw(|f| layout = draw_ui(f, state.last_update.as_ref(), &mut state.wrapped_cache, styles))
        .map_err(to_boxed_err)?;
    state.layout = layout;
    Ok(())
}

/// Translate one terminal event into engine inputs, updating local UI state.
fn handle_terminal_event(event: Event, state: &mut ModernUIState) -> Vec<Input> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(key, state),
        Event::Mouse(mouse) => handle_mouse(mouse, state),
        _ => Vec::new(),
    }
}

fn handle_key(key: KeyEvent, state: &mut ModernUIState) -> Vec<Input> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.should_exit = true;
            Vec::new()
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_exit = true;
            Vec::new()
        }
        KeyCode::Char(' ') => vec![Input::TogglePlay],
        KeyCode::Char('s') => vec![Input::Stop],
        KeyCode::Char('+') | KeyCode::Char('=') => vec![Input::ChangeSpeed(state.speed_step)],
        KeyCode::Char('-') => vec![Input::ChangeSpeed(-state.speed_step)],
        // Scrub keys open a drag if none is active; Enter commits it.
        KeyCode::Left => vec![Input::DragStart(DragSource::ProgressBar), Input::DragBy(-KEY_SCRUB_SECONDS)],
        KeyCode::Right => vec![Input::DragStart(DragSource::ProgressBar), Input::DragBy(KEY_SCRUB_SECONDS)],
        KeyCode::Up => vec![Input::DragStart(DragSource::LyricList), Input::DragLines(-1)],
        KeyCode::Down => vec![Input::DragStart(DragSource::LyricList), Input::DragLines(1)],
        KeyCode::Enter => vec![Input::DragEnd],
        KeyCode::Backspace => {
            state.gesture = None;
            vec![Input::DragCancel]
        }
        _ => Vec::new(),
    }
}

fn handle_mouse(mouse: MouseEvent, state: &mut ModernUIState) -> Vec<Input> {
    let at = Position::new(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if state.layout.progress.contains(at) {
                state.gesture = Some(MouseGesture::Progress);
                let mut inputs = vec![Input::DragStart(DragSource::ProgressBar)];
                inputs.extend(progress_target(state, mouse.column));
                inputs
            } else if state.layout.lyrics.contains(at) {
                state.gesture = Some(MouseGesture::Lyrics { last_row: mouse.row });
                vec![Input::DragStart(DragSource::LyricList)]
            } else {
                Vec::new()
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => match state.gesture {
            Some(MouseGesture::Progress) => progress_target(state, mouse.column).into_iter().collect(),
            Some(MouseGesture::Lyrics { last_row }) => {
                // Dragging the list up brings later lines to the middle.
                let lines = i64::from(last_row) - i64::from(mouse.row);
                if lines == 0 {
                    return Vec::new();
                }
                state.gesture = Some(MouseGesture::Lyrics { last_row: mouse.row });
                vec![Input::DragLines(lines)]
            }
            None => Vec::new(),
        },
        MouseEventKind::Up(MouseButton::Left) => match state.gesture.take() {
            Some(_) => vec![Input::DragEnd],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Absolute seek target for a progress bar column. Unknown durations have
/// no meaningful fraction.
fn progress_target(state: &ModernUIState, column: u16) -> Option<Input> {
    let duration = state.duration();
    (duration > 0.0).then(|| Input::DragTo(bar_fraction(state.layout.progress, column) * duration))
}

fn to_boxed_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::layout::Rect;

    fn state_with_layout() -> ModernUIState {
        let mut state = ModernUIState::new(1.0);
        state.layout = ScreenLayout {
            lyrics: Rect::new(0, 1, 80, 20),
            progress: Rect::new(0, 22, 81, 1),
        };
        state.last_update = Some(Update { duration: 200.0, ..Update::default() });
        state
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE })
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn keys_map_to_transport_and_scrub() {
        let mut state = state_with_layout();
        assert_eq!(handle_terminal_event(key(KeyCode::Char(' ')), &mut state), vec![Input::TogglePlay]);
        assert_eq!(handle_terminal_event(key(KeyCode::Char('-')), &mut state), vec![Input::ChangeSpeed(-1.0)]);
        assert_eq!(
            handle_terminal_event(key(KeyCode::Right), &mut state),
            vec![Input::DragStart(DragSource::ProgressBar), Input::DragBy(5.0)]
        );
        assert_eq!(handle_terminal_event(key(KeyCode::Enter), &mut state), vec![Input::DragEnd]);
        assert_eq!(handle_terminal_event(key(KeyCode::Backspace), &mut state), vec![Input::DragCancel]);
        assert!(!state.should_exit);
        assert!(handle_terminal_event(key(KeyCode::Char('q')), &mut state).is_empty());
        assert!(state.should_exit);
    }

    #[test]
    fn progress_bar_drag_maps_columns_to_time() {
        let mut state = state_with_layout();
        let down = handle_terminal_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 22), &mut state);
        assert_eq!(down, vec![Input::DragStart(DragSource::ProgressBar), Input::DragTo(50.0)]);
        let drag = handle_terminal_event(mouse(MouseEventKind::Drag(MouseButton::Left), 80, 5), &mut state);
        assert_eq!(drag, vec![Input::DragTo(200.0)]);
        let up = handle_terminal_event(mouse(MouseEventKind::Up(MouseButton::Left), 80, 5), &mut state);
        assert_eq!(up, vec![Input::DragEnd]);
    }

    #[test]
    fn lyric_drag_moves_by_rows() {
        let mut state = state_with_layout();
        let down = handle_terminal_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 10), &mut state);
        assert_eq!(down, vec![Input::DragStart(DragSource::LyricList)]);
        let up_two = handle_terminal_event(mouse(MouseEventKind::Drag(MouseButton::Left), 10, 8), &mut state);
        assert_eq!(up_two, vec![Input::DragLines(2)]);
        let same = handle_terminal_event(mouse(MouseEventKind::Drag(MouseButton::Left), 12, 8), &mut state);
        assert!(same.is_empty());
        let down_one = handle_terminal_event(mouse(MouseEventKind::Drag(MouseButton::Left), 10, 9), &mut state);
        assert_eq!(down_one, vec![Input::DragLines(-1)]);
    }

    #[test]
    fn backspace_abandons_mouse_drag() {
        let mut state = state_with_layout();
        handle_terminal_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 10), &mut state);
        let cancel = handle_terminal_event(key(KeyCode::Backspace), &mut state);
        assert_eq!(cancel, vec![Input::DragCancel]);
        let up = handle_terminal_event(mouse(MouseEventKind::Up(MouseButton::Left), 10, 8), &mut state);
        assert!(up.is_empty());
    }

    #[test]
    fn stray_release_is_ignored() {
        let mut state = state_with_layout();
        let outside = handle_terminal_event(mouse(MouseEventKind::Down(MouseButton::Left), 10, 0), &mut state);
        assert!(outside.is_empty());
        let up = handle_terminal_event(mouse(MouseEventKind::Up(MouseButton::Left), 10, 0), &mut state);
        assert!(up.is_empty());
    }

    #[test]
    fn unknown_duration_drag_has_no_target() {
        let mut state = state_with_layout();
        state.last_update = None;
        let down = handle_terminal_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 22), &mut state);
        assert_eq!(down, vec![Input::DragStart(DragSource::ProgressBar)]);
    }
}
