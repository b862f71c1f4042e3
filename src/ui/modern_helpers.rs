use crate::state::{Availability, Update};
use crate::text_utils::{format_time, truncate_to_width, wrap_text};
use crate::ui::styles::LyricStyles;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Gauge, Paragraph};

/// Screen regions that accept mouse gestures, as laid out by the last draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenLayout {
    pub lyrics: Rect,
    pub progress: Rect,
}

/// Wrapped lyric lines for the whole timeline at one terminal width.
/// Rebuilt only when the width or the timeline changes.
#[derive(Debug)]
pub struct WrapCache {
    width: usize,
    version: u64,
    blocks: Vec<Vec<String>>,
}

pub fn wrapped_blocks<'c>(cache: &'c mut Option<WrapCache>, upd: &Update, width: usize) -> &'c [Vec<String>] {
    let fresh = matches!(cache, Some(c) if c.width == width && c.version == upd.timeline_version);
    if !fresh {
        *cache = None;
    }
    &cache
        .get_or_insert_with(|| WrapCache {
            width,
            version: upd.timeline_version,
            blocks: upd.timeline.iter().map(|l| wrap_text(&l.text, width)).collect(),
        })
        .blocks
}

/// Rows for the lyric area, vertically centered on the current line.
pub fn lyric_rows(upd: &Update, blocks: &[Vec<String>], height: usize, styles: &LyricStyles) -> Vec<Line<'static>> {
    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut anchor: Option<(usize, usize)> = None;
    for vl in &upd.lines {
        let style = if vl.is_current {
            if upd.dragging { styles.pending } else { styles.current }
        } else if upd.current.is_some_and(|c| vl.index < c) {
            styles.before
        } else {
            styles.after
        };
        let fallback;
        let block: &[String] = match blocks.get(vl.index) {
            Some(block) => block,
            None => {
                fallback = [vl.text.clone()];
                &fallback
            }
        };
        if vl.is_current {
            anchor = Some((rows.len(), block.len()));
        }
        rows.extend(block.iter().map(|text| Line::from(Span::styled(text.clone(), style))));
    }

    let center = height / 2;
    let shift = match anchor {
        Some((start, len)) => center as isize - (start + len / 2) as isize,
        None => (height.saturating_sub(rows.len()) / 2) as isize,
    };
    let mut out: Vec<Line<'static>> = Vec::with_capacity(height);
    if shift >= 0 {
        out.extend(std::iter::repeat_n(Line::default(), shift as usize));
        out.extend(rows);
    } else {
        out.extend(rows.into_iter().skip(shift.unsigned_abs()));
    }
    out.truncate(height);
    out
}

fn header_line(upd: &Update) -> String {
    let mut header = format!("{}  [{}]  x{}", upd.song_name, upd.status, upd.speed);
    if upd.stale {
        header.push_str("  (reconnecting...)");
    }
    header
}

fn progress_label(upd: &Update) -> String {
    if upd.duration > 0.0 {
        format!("{} / {}", format_time(upd.position), format_time(upd.duration))
    } else {
        format_time(upd.position)
    }
}

/// Where along the progress bar `column` falls, in `[0, 1]`.
pub fn bar_fraction(area: Rect, column: u16) -> f64 {
    if area.width <= 1 {
        return 0.0;
    }
    let x = column.saturating_sub(area.x).min(area.width - 1);
    f64::from(x) / f64::from(area.width - 1)
}

fn message(f: &mut Frame, area: Rect, text: &str, styles: &LyricStyles) {
    let top = area.height / 2;
    let line_area = Rect { y: area.y + top, height: area.height.saturating_sub(top).min(1), ..area };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(text.to_string(), styles.after))).alignment(Alignment::Center),
        line_area,
    );
}

/// Draw one frame and report the layout used for mouse hit-testing.
pub fn draw_ui(
    f: &mut Frame,
    last_update: Option<&Update>,
    cache: &mut Option<WrapCache>,
    styles: &LyricStyles,
) -> ScreenLayout {
    let [header_area, lyrics_area, notice_area, progress_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(f.area());
    let layout = ScreenLayout { lyrics: lyrics_area, progress: progress_area };

    let Some(upd) = last_update else {
        message(f, lyrics_area, "Connecting to player...", styles);
        return layout;
    };
    match upd.availability {
        Availability::Loading => {
            message(f, lyrics_area, "Connecting to player...", styles);
            return layout;
        }
        Availability::NoPlayback => {
            message(f, lyrics_area, "No active playback", styles);
            return layout;
        }
        Availability::Active => {}
    }

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            truncate_to_width(&header_line(upd), usize::from(header_area.width)),
            styles.header,
        )))
        .alignment(Alignment::Center),
        header_area,
    );

    if upd.timeline.is_empty() {
        message(f, lyrics_area, "No lyrics for this song", styles);
    } else {
        let blocks = wrapped_blocks(cache, upd, usize::from(lyrics_area.width));
        let rows = lyric_rows(upd, blocks, usize::from(lyrics_area.height), styles);
        f.render_widget(Paragraph::new(rows).alignment(Alignment::Center), lyrics_area);
    }

    if let Some(notice) = &upd.notice {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(notice.clone(), styles.notice))).alignment(Alignment::Center),
            notice_area,
        );
    }

    f.render_widget(
        Gauge::default()
            .gauge_style(styles.gauge)
            .ratio(upd.progress.clamp(0.0, 1.0))
            .label(progress_label(upd)),
        progress_area,
    );
    layout
}
