//! Types shared between the playback engine and output devices.

use std::time::Duration;

use super::error::PlaybackError;

/// Identifies one assignment of a source to the device. Events carrying an
/// older generation belong to a source that is no longer current.
pub type Generation = u64;

/// Identifies one play command, so a late answer can be matched (or ignored).
pub type PlayTicket = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Fetch and prepare `source`, paused at 0.
    Load { source: String, generation: Generation },
    /// Stop and forget the current source.
    Unload,
    /// Start (or resume) playback; answered with `PlayResolved`.
    Play { ticket: PlayTicket },
    Pause,
    Seek(Duration),
    /// Output gain in `[0, 1]`; muting is expressed as 0.
    SetVolume(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    pub generation: Generation,
    pub kind: DeviceEventKind,
}

impl DeviceEvent {
    pub fn new(generation: Generation, kind: DeviceEventKind) -> Self {
        Self { generation, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEventKind {
    /// Duration is known (seconds; 0 when the source does not say).
    MetadataLoaded { duration: f64 },
    /// Playback position advanced (seconds).
    TimeUpdate { position: f64 },
    /// The source played to its end.
    Ended,
    /// Loading or playback failed.
    Fault { message: Option<String> },
    /// Outcome of `Play { ticket }`.
    PlayResolved {
        ticket: PlayTicket,
        result: Result<(), String>,
    },
}

/// Coarse lifecycle of the engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Nothing selected.
    #[default]
    Empty,
    /// Source assigned, metadata not yet known.
    Loading,
    Paused,
    Playing,
    Error,
}

/// Snapshot of everything a renderer needs. Owned by the engine; observers
/// only ever see copies.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub status: PlayerStatus,
    /// Seconds; never above `duration` once the duration is known.
    pub current_time: f64,
    /// Seconds; 0 until the device reports it.
    pub duration: f64,
    /// The requested play/pause state, not what the device is doing.
    pub is_playing: bool,
    /// Stored volume in `[0, 1]`; kept while muted.
    pub volume: f32,
    pub is_muted: bool,
    pub is_repeat: bool,
    pub is_shuffle: bool,
    pub audio_error: Option<PlaybackError>,
    /// Set when a song ended without repeat, until the next play, seek or source change.
    pub reached_end: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlayerStatus::Empty,
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: 1.0,
            is_muted: false,
            is_repeat: false,
            is_shuffle: false,
            audio_error: None,
            reached_end: false,
        }
    }
}

impl PlaybackState {
    /// Error text for display; empty when there is none.
    pub fn audio_error_text(&self) -> String {
        self.audio_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Gain the device should apply.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted { 0.0 } else { self.volume }
    }
}
