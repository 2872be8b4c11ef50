//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`. The
//! renderer reports where the progress and volume bars ended up so mouse
//! clicks can be turned into seek and volume gestures.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::App;
use crate::audio::{PlaybackState, PlayerStatus};
use crate::config::{ControlsSettings, UiSettings};
use crate::transport::{format_time, progress_fraction, time_label};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play selected song");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next song");
    // H/L is filled dynamically from config.
    map.insert("+/-", "volume");
    map.insert("m", "mute");
    map.insert("r", "repeat");
    map.insert("s", "shuffle");
    map.insert("c", "category");
    map.insert("f", "favorite");
    map.insert("v", "like");
    map.insert("/", "filter");
    map.insert("q", "quit");
    map
});

/// Screen areas of the interactive bars from the last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitAreas {
    pub progress: Rect,
    pub volume: Rect,
}

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "+/-", "m", "r", "s", "c", "f", "v",
        "/", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

fn status_word(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Empty => "Stopped",
        PlayerStatus::Loading => "Loading",
        PlayerStatus::Paused => "Paused",
        PlayerStatus::Playing => "Playing",
        PlayerStatus::Error => "Error",
    }
}

fn status_text(app: &App, state: &PlaybackState) -> String {
    let mut parts: Vec<String> = vec![format!(" CATEGORY: {}", app.active_category())];

    let q = app.filter_query.trim();
    if app.filter_mode || !q.is_empty() {
        let mut filter_part = String::from("FILTER:");
        if !q.is_empty() {
            filter_part.push(' ');
            filter_part.push_str(q);
        }
        parts.push(filter_part);
    }

    parts.push(format!(
        "Repeat: {}",
        if state.is_repeat { "ON" } else { "OFF" }
    ));
    // The navigator owns the shuffled order, so it is the source of truth.
    parts.push(format!(
        "Shuffle: {}",
        if app.navigator().is_shuffled() { "ON" } else { "OFF" }
    ));
    parts.push(status_word(state.status).to_string());
    parts.join(" • ")
}

/// List row for catalog index `i`, with the filter matches uppercased.
fn row_text(app: &App, i: usize, q: &str, query_lower: Option<&str>) -> String {
    let title = app.display(i);
    let mut rendered = String::new();
    rendered.push_str(if app.now_playing == Some(i) { "♪ " } else { "  " });
    rendered.push_str(if app.is_favorite(i) { "♥ " } else { "  " });

    let positions = if q.is_empty() {
        None
    } else {
        match query_lower {
            Some(ql) => app.fuzzy_match_positions_for_track_lower(i, ql),
            None => App::fuzzy_match_positions(title, q),
        }
    };
    let Some(positions) = positions else {
        rendered.push_str(title);
        return with_audio_marker(app, i, rendered);
    };

    let mut pos_iter = positions.into_iter();
    let mut next_pos = pos_iter.next();
    for (ci, ch) in title.chars().enumerate() {
        if next_pos == Some(ci) {
            rendered.extend(ch.to_uppercase());
            next_pos = pos_iter.next();
        } else {
            rendered.push(ch);
        }
    }
    with_audio_marker(app, i, rendered)
}

fn with_audio_marker(app: &App, i: usize, mut row: String) -> String {
    if app.tracks.get(i).is_some_and(|t| !t.has_audio()) {
        row.push_str("  (no audio)");
    }
    row
}

fn draw_list(frame: &mut Frame, area: Rect, app: &App, display: &[usize]) {
    let q = app.filter_query.trim();
    let query_lower = (!q.is_empty() && app.uses_lower_displays()).then(|| q.to_ascii_lowercase());

    // Center the selected item when possible by creating a visible window.
    // Important: only build ListItems for the visible window (avoid allocating the entire list).
    let total = display.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let sel_pos = display.iter().position(|&i| i == app.selected).unwrap_or(0);
    let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
        (0, total, sel_pos)
    } else {
        let half = list_height / 2;
        let mut start = sel_pos.saturating_sub(half);
        if start + list_height > total {
            start = total - list_height;
        }
        (start, start + list_height, sel_pos - start)
    };

    let visible_items: Vec<ListItem> = display[start..end]
        .iter()
        .map(|&i| ListItem::new(row_text(app, i, q, query_lower.as_deref())))
        .collect();

    let title = if total == 0 {
        " tracks (none match) ".to_string()
    } else {
        format!(" tracks ({}) ", total)
    };
    let list = List::new(visible_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut list_state = ratatui::widgets::ListState::default();
    if total > 0 {
        list_state.select(Some(selected_pos_in_visible));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_player(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    state: &PlaybackState,
    ui: &UiSettings,
) -> HitAreas {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" now playing ")
        .padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    // Song line: like flag, title, artist, cover.
    let mut song = vec![
        Span::raw(if app.is_liked() { "♥ " } else { "♡ " }),
        Span::raw(app.now_playing_title().to_string()).bold(),
    ];
    let artist = app.now_playing_artist().trim();
    if !artist.is_empty() {
        song.push(Span::raw(format!(" - {}", artist)));
    }
    song.push(Span::raw(format!("  [{}]", app.now_playing_cover())).dim());
    frame.render_widget(Paragraph::new(Line::from(song)), rows[0]);

    // Bars: elapsed, progress, total, volume.
    let bars = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(7),
        ])
        .split(rows[1]);

    let elapsed = format_time(state.current_time);
    let total = format_time(state.duration);
    frame.render_widget(
        Paragraph::new(elapsed.as_str()).alignment(Alignment::Right),
        bars[0],
    );
    let progress = Gauge::default()
        .ratio(progress_fraction(state.current_time, state.duration))
        .label(time_label(state, &ui.time_separator))
        .use_unicode(true);
    frame.render_widget(progress, bars[1]);
    frame.render_widget(Paragraph::new(format!(" {}", total)), bars[2]);
    frame.render_widget(
        Paragraph::new("vol").alignment(Alignment::Right),
        bars[3],
    );
    let volume_ratio = f64::from(state.effective_volume()).clamp(0.0, 1.0);
    let volume = Gauge::default()
        .ratio(volume_ratio)
        .label(format!("{:.0}%", state.volume * 100.0))
        .use_unicode(true);
    frame.render_widget(volume, bars[4]);
    if state.is_muted {
        frame.render_widget(Paragraph::new(" muted").red(), bars[5]);
    }

    // Error line.
    let error = state.audio_error_text();
    if !error.is_empty() {
        frame.render_widget(
            Paragraph::new(format!("Error: {}", error)).red(),
            rows[2],
        );
    }

    HitAreas {
        progress: bars[1],
        volume: bars[4],
    }
}

/// Render the entire UI into the provided `frame`; returns where the
/// clickable bars were drawn.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    state: &PlaybackState,
    display: &[usize],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) -> HitAreas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(5),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" legato ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app, state))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    draw_list(frame, chunks[2], app, display);
    let hits = draw_player(frame, chunks[3], app, state, ui_settings);

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);

    hits
}
