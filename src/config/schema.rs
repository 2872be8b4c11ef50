use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/legato/config.toml` or `~/.config/legato/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `LEGATO__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stream: StreamSettings,
    pub audio: AudioSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Base address that relative `audio_src` paths are joined onto.
    pub base_url: String,
    /// Connection timeout when fetching a song (milliseconds).
    pub connect_timeout_ms: u64,
    /// Whole-request timeout when fetching a song (milliseconds).
    pub read_timeout_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            connect_timeout_ms: 5_000,
            read_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Volume at startup, in `[0, 1]`.
    pub default_volume: f32,
    /// Volume restored by unmuting when the stored volume is 0.
    pub unmute_volume: f32,
    /// Amount `+`/`-` change the volume by.
    pub volume_step: f32,
    /// How often the device reports playback position (milliseconds).
    pub tick_ms: u64,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            default_volume: 0.7,
            unmute_volume: 0.5,
            volume_step: 0.05,
            tick_ms: 250,
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Title shown in the player bar when nothing is selected.
    pub placeholder_title: String,

    /// Cover shown for tracks without artwork.
    pub placeholder_cover: String,

    /// Which track fields make up a list row, and in what order.
    ///
    /// Example: ["artist", "title"]
    pub track_fields: Vec<TrackDisplayField>,

    /// Separator used to join `track_fields`.
    pub track_separator: String,

    /// Separator between the elapsed and total time labels.
    pub time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ legato: music, streamed ~ ".to_string(),
            placeholder_title: "Select a song".to_string(),
            placeholder_cover: "default-cover.jpg".to_string(),
            track_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            track_separator: " - ".to_string(),
            time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { scrub_seconds: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Whether repeat-one starts enabled.
    pub repeat: bool,
    /// Whether next/previous wrap around the ends of the list.
    pub wrap_around: bool,
    /// Keep playing when a song ends and the next one is picked.
    pub continue_after_end: bool,
    /// Start playing as soon as a song is picked from the list.
    pub autoplay_on_select: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: false,
            wrap_around: false,
            continue_after_end: true,
            autoplay_on_select: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    #[serde(alias = "genre")]
    Category,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Catalog file with `[[track]]` entries. Defaults to `catalog.toml`
    /// next to the config file.
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "legato=debug").
    pub level: String,
    /// Log file. Defaults to `$XDG_STATE_HOME/legato/legato.log`.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
