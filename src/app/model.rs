//! Application model: `App`.
//!
//! `App` is the playlist owner. The playback engine only ever asks it for
//! the next or previous track; ordering, wrap-around and shuffle are
//! decided here through the [`Navigator`].

use std::collections::HashSet;

use crate::config::UiSettings;
use crate::library::{ALL_CATEGORIES, TrackDescriptor, category_tabs, display_from_fields};
use crate::navigator::Navigator;

/// The main application model.
pub struct App {
    pub tracks: Vec<TrackDescriptor>,
    pub selected: usize,
    /// Catalog index handed to the engine, if any.
    pub now_playing: Option<usize>,

    displays: Vec<String>,
    lower_displays: Option<Vec<String>>,

    pub categories: Vec<String>,
    pub category: usize,

    pub filter_mode: bool,
    pub filter_query: String,

    favorites: HashSet<String>,
    liked: HashSet<String>,

    navigator: Navigator,
    placeholder_title: String,
    placeholder_cover: String,
}

impl App {
    /// Create a new `App` over `tracks`, with list rows built from `ui`.
    pub fn new(tracks: Vec<TrackDescriptor>, ui: &UiSettings, navigator: Navigator) -> Self {
        let displays: Vec<String> = tracks
            .iter()
            .map(|t| {
                display_from_fields(t, &ui.track_fields, &ui.track_separator, &ui.placeholder_title)
            })
            .collect();
        // Optimization: for larger catalogs, precompute lowercase rows to speed up fuzzy
        // filtering (avoid per-char lowercase conversions on every redraw/keystroke).
        let lower_displays = (tracks.len() > 100)
            .then(|| displays.iter().map(|d| d.to_ascii_lowercase()).collect());
        let categories = category_tabs(&tracks);

        Self {
            tracks,
            selected: 0,
            now_playing: None,
            displays,
            lower_displays,
            categories,
            category: 0,
            filter_mode: false,
            filter_query: String::new(),
            favorites: HashSet::new(),
            liked: HashSet::new(),
            navigator,
            placeholder_title: ui.placeholder_title.clone(),
            placeholder_cover: ui.placeholder_cover.clone(),
        }
    }

    /// List row text for the track at `index`.
    pub fn display(&self, index: usize) -> &str {
        self.displays.get(index).map_or("", String::as_str)
    }

    /// Return true if this `App` uses precomputed lowercase rows.
    pub fn uses_lower_displays(&self) -> bool {
        self.lower_displays.is_some()
    }

    pub fn active_category(&self) -> &str {
        self.categories
            .get(self.category)
            .map_or(ALL_CATEGORIES, String::as_str)
    }

    /// Move to the next category tab, wrapping back to "All".
    pub fn cycle_category(&mut self) {
        if !self.categories.is_empty() {
            self.category = (self.category + 1) % self.categories.len();
        }
        self.ensure_selected_visible();
    }

    fn in_active_category(&self, index: usize) -> bool {
        let active = self.active_category();
        active == ALL_CATEGORIES || self.tracks[index].category.trim() == active
    }

    /// Catalog indices currently visible, in catalog order, after the
    /// category tab and the filter query are applied.
    pub fn display_indices(&self) -> Vec<usize> {
        let base = (0..self.tracks.len()).filter(|&i| self.in_active_category(i));

        let query = self.filter_query.trim();
        if query.is_empty() {
            return base.collect();
        }
        match self.lower_displays.as_deref() {
            Some(lower) => {
                let query_lower = query.to_ascii_lowercase();
                base.filter(|&i| Self::fuzzy_match_positions_lower(&lower[i], &query_lower).is_some())
                    .collect()
            }
            None => base
                .filter(|&i| Self::fuzzy_match_positions(&self.displays[i], query).is_some())
                .collect(),
        }
    }

    /// Fuzzy-match `query_lower` against a specific track by index.
    ///
    /// Returns the character positions that match, or `None` when there is no match.
    pub fn fuzzy_match_positions_for_track_lower(
        &self,
        track_index: usize,
        query_lower: &str,
    ) -> Option<Vec<usize>> {
        if query_lower.is_empty() {
            return Some(Vec::new());
        }
        match self.lower_displays.as_deref() {
            Some(lower) => Self::fuzzy_match_positions_lower(&lower[track_index], query_lower),
            None => Self::fuzzy_match_positions(self.display(track_index), query_lower),
        }
    }

    /// Fuzzy/subsequence match: return the character positions in `title`
    /// that match `query`, or `None` if not matched.
    pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
        if query.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title.chars().enumerate();

        for qc in query.chars() {
            let qc_low = qc.to_ascii_lowercase();
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc.to_ascii_lowercase() == qc_low => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    fn fuzzy_match_positions_lower(title_lower: &str, query_lower: &str) -> Option<Vec<usize>> {
        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title_lower.chars().enumerate();

        for qc in query_lower.chars() {
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc == qc => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    /// Enter filter mode.
    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.ensure_selected_visible();
    }
    /// Leave filter mode, keeping the query.
    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }
    /// Clear the active filter and restore selection visibility.
    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }
    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }
    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Ensure that `selected` is part of the current view, otherwise move
    /// selection to the first visible track.
    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        match display.first() {
            None => self.selected = 0,
            Some(&first) if !display.contains(&self.selected) => self.selected = first,
            Some(_) => {}
        }
    }

    /// Move the cursor to the next visible track, wrapping to the top.
    pub fn next(&mut self) {
        let display = self.display_indices();
        if display.is_empty() {
            return;
        }
        let pos = display.iter().position(|&i| i == self.selected);
        self.selected = match pos {
            Some(p) => display[(p + 1) % display.len()],
            None => display[0],
        };
    }

    /// Move the cursor to the previous visible track, wrapping to the bottom.
    pub fn prev(&mut self) {
        let display = self.display_indices();
        let Some(&last) = display.last() else {
            return;
        };
        let pos = display.iter().position(|&i| i == self.selected);
        self.selected = match pos {
            Some(0) | None => last,
            Some(p) => display[p - 1],
        };
    }

    pub fn select_first(&mut self) {
        if let Some(&first) = self.display_indices().first() {
            self.selected = first;
        }
    }

    pub fn select_last(&mut self) {
        if let Some(&last) = self.display_indices().last() {
            self.selected = last;
        }
    }

    /// Make the cursor's track the one playing. Returns it, or `None` when
    /// the view is empty.
    pub fn play_selected(&mut self) -> Option<usize> {
        if !self.display_indices().contains(&self.selected) {
            return None;
        }
        self.now_playing = Some(self.selected);
        self.now_playing
    }

    /// Advance the now-playing track. `None` means there is nowhere to go
    /// and nothing changed.
    pub fn next_track(&mut self) -> Option<usize> {
        let next = self.navigator.next(self.now_playing, &self.display_indices())?;
        self.follow(next);
        Some(next)
    }

    pub fn previous_track(&mut self) -> Option<usize> {
        let prev = self
            .navigator
            .previous(self.now_playing, &self.display_indices())?;
        self.follow(prev);
        Some(prev)
    }

    fn follow(&mut self, index: usize) {
        self.now_playing = Some(index);
        self.selected = index;
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.navigator.set_shuffle(on, self.tracks.len());
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn now_playing_track(&self) -> Option<&TrackDescriptor> {
        self.now_playing.and_then(|i| self.tracks.get(i))
    }

    /// Title for the player bar, or the placeholder when nothing plays.
    pub fn now_playing_title(&self) -> &str {
        match self.now_playing_track() {
            Some(t) => t.title_or(&self.placeholder_title),
            None => &self.placeholder_title,
        }
    }

    pub fn now_playing_artist(&self) -> &str {
        self.now_playing_track().map_or("", |t| t.artist.as_str())
    }

    pub fn now_playing_cover(&self) -> &str {
        match self.now_playing_track() {
            Some(t) => t.cover_or(&self.placeholder_cover),
            None => &self.placeholder_cover,
        }
    }

    fn toggle_in(set: &mut HashSet<String>, id: &str) -> bool {
        if set.remove(id) {
            false
        } else {
            set.insert(id.to_string());
            true
        }
    }

    /// Flip the favorite mark on the cursor's track; returns the new mark.
    pub fn toggle_favorite(&mut self) -> bool {
        let Some(track) = self.tracks.get(self.selected) else {
            return false;
        };
        Self::toggle_in(&mut self.favorites, &track.id)
    }

    pub fn is_favorite(&self, index: usize) -> bool {
        self.tracks
            .get(index)
            .is_some_and(|t| self.favorites.contains(&t.id))
    }

    /// Flip "liked" on the now-playing track; returns the new mark.
    pub fn toggle_like(&mut self) -> bool {
        let Some(track) = self.now_playing.and_then(|i| self.tracks.get(i)) else {
            return false;
        };
        Self::toggle_in(&mut self.liked, &track.id)
    }

    pub fn is_liked(&self) -> bool {
        self.now_playing_track()
            .is_some_and(|t| self.liked.contains(&t.id))
    }
}
