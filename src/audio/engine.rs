//! The playback engine: one state machine per player, driven by user
//! operations on one side and device events on the other.
//!
//! Lifecycle, as reported by [`PlayerStatus`]:
//!
//! ```text
//! Empty --source--> Loading --metadata--> Ready(Paused|Playing)
//!                      \                     |
//!                       +------fault-------> Error
//! ```
//!
//! `is_playing` is the *requested* state. The device may lag behind it; its
//! answers are matched against the generation of the current source and the
//! ticket of the latest play request, so nothing stale ever lands in state.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::config::Settings;
use crate::library::TrackDescriptor;
use crate::resolver::UrlResolver;

use super::device::OutputDevice;
use super::error::{LOAD_FAULT_FALLBACK, PLAY_REJECTED_FALLBACK, PlaybackError};
use super::types::{
    DeviceCommand, DeviceEvent, DeviceEventKind, Generation, PlayTicket, PlaybackState,
    PlayerStatus,
};

/// Hooks into the parent's track navigation. The engine never decides which
/// track comes next; it only asks.
pub struct Navigation {
    on_next: Box<dyn FnMut()>,
    on_previous: Box<dyn FnMut()>,
}

impl Navigation {
    pub fn new(on_next: impl FnMut() + 'static, on_previous: impl FnMut() + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_previous: Box::new(on_previous),
        }
    }

    /// Navigation that goes nowhere.
    pub fn none() -> Self {
        Self::new(|| {}, || {})
    }
}

/// Initial values for the persistent part of the state.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    pub volume: f32,
    /// Volume restored by unmuting when the stored volume is 0.
    pub unmute_volume: f32,
    pub repeat: bool,
    pub shuffle: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            unmute_volume: 0.5,
            repeat: false,
            shuffle: false,
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            volume: settings.audio.default_volume,
            unmute_volume: settings.audio.unmute_volume,
            repeat: settings.playback.repeat,
            shuffle: settings.playback.shuffle,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Clamp a requested time into `[0, duration]`; NaN becomes 0.
pub fn clamp_time(time: f64, duration: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(0.0, duration.max(0.0))
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

pub struct PlaybackEngine<D: OutputDevice> {
    device: D,
    resolver: UrlResolver,
    navigation: Navigation,
    unmute_volume: f32,

    source: String,
    phase: Phase,
    generation: Generation,
    next_ticket: PlayTicket,
    pending_play: Option<PlayTicket>,
    /// Metadata arrived for the current source.
    loaded: bool,

    state: PlaybackState,
    published: PlaybackState,
    subscribers: Vec<Sender<PlaybackState>>,
}

impl<D: OutputDevice> PlaybackEngine<D> {
    pub fn new(mut device: D, resolver: UrlResolver, options: EngineOptions) -> Self {
        let state = PlaybackState {
            volume: clamp_volume(options.volume),
            is_muted: clamp_volume(options.volume) == 0.0,
            is_repeat: options.repeat,
            is_shuffle: options.shuffle,
            ..PlaybackState::default()
        };
        device.submit(DeviceCommand::SetVolume(state.effective_volume()));

        Self {
            device,
            resolver,
            navigation: Navigation::none(),
            unmute_volume: clamp_volume(options.unmute_volume),
            source: String::new(),
            phase: Phase::Empty,
            generation: 0,
            next_ticket: 0,
            pending_play: None,
            loaded: false,
            published: state.clone(),
            state,
            subscribers: Vec::new(),
        }
    }

    pub fn set_navigation(&mut self, navigation: Navigation) {
        self.navigation = navigation;
    }

    /// Receive a snapshot now and after every change.
    pub fn subscribe(&mut self) -> Receiver<PlaybackState> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.state.clone());
        self.subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlayerStatus {
        self.state.status
    }

    /// Resolved URL of the current source; empty when nothing is selected.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current error text, empty when there is none.
    pub fn audio_error(&self) -> String {
        self.state.audio_error_text()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Select `track` (or nothing). Resolving, loading and resetting progress
    /// follow from the source change.
    pub fn load_track(&mut self, track: Option<&TrackDescriptor>) {
        self.load_source(track.map_or("", |t| t.audio_src.as_str()));
    }

    /// Assign a new raw source. Re-assigning the current source changes nothing.
    pub fn load_source(&mut self, audio_src: &str) {
        let resolved = self.resolver.resolve(audio_src);
        if resolved == self.source {
            return;
        }
        self.source = resolved;
        self.pending_play = None;
        self.loaded = false;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.state.audio_error = None;
        self.state.reached_end = false;

        if self.source.is_empty() {
            tracing::debug!("source cleared");
            self.phase = Phase::Empty;
            self.state.is_playing = false;
            self.device.submit(DeviceCommand::Unload);
        } else {
            self.generation += 1;
            tracing::debug!(source = %self.source, generation = self.generation, "source assigned");
            self.phase = Phase::Loading;
            self.device.submit(DeviceCommand::Load {
                source: self.source.clone(),
                generation: self.generation,
            });
        }
        self.commit();
    }

    pub fn play(&mut self) {
        if self.phase == Phase::Empty {
            tracing::debug!("play requested with nothing selected");
            self.state.audio_error = Some(PlaybackError::NoSourceSelected);
            self.state.is_playing = false;
            self.commit();
            return;
        }
        let already = self.state.is_playing && self.phase == Phase::Ready;
        self.state.is_playing = true;
        self.state.reached_end = false;
        // While loading, the play is issued once metadata arrives.
        if !already && self.phase != Phase::Loading {
            self.issue_play();
        }
        self.commit();
    }

    pub fn pause(&mut self) {
        self.state.is_playing = false;
        self.pending_play = None;
        if self.phase != Phase::Empty {
            self.device.submit(DeviceCommand::Pause);
        }
        self.commit();
    }

    pub fn set_playing(&mut self, playing: bool) {
        if playing { self.play() } else { self.pause() }
    }

    pub fn toggle_play(&mut self) {
        self.set_playing(!self.state.is_playing);
    }

    /// Jump to `time` seconds, clamped into `[0, duration]`. Only meaningful
    /// once the source is ready; otherwise nothing happens.
    pub fn seek(&mut self, time: f64) {
        if self.phase != Phase::Ready {
            return;
        }
        let target = clamp_time(time, self.state.duration);
        self.state.current_time = target;
        self.state.reached_end = false;
        // An outstanding play still answers for the new position.
        self.device
            .submit(DeviceCommand::Seek(Duration::from_secs_f64(target)));
        self.commit();
    }

    /// Relative seek, used by the scrub keys.
    pub fn seek_by(&mut self, delta: f64) {
        self.seek(self.state.current_time + delta);
    }

    /// Set the stored volume, clamped into `[0, 1]`. Setting 0 also mutes.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.state.volume = volume;
        if volume == 0.0 {
            self.state.is_muted = true;
        }
        self.apply_volume();
        self.commit();
    }

    pub fn toggle_mute(&mut self) {
        if self.state.is_muted {
            if self.state.volume <= 0.0 {
                self.state.volume = self.unmute_volume;
            }
            self.state.is_muted = false;
        } else {
            self.state.is_muted = true;
        }
        self.apply_volume();
        self.commit();
    }

    pub fn toggle_repeat(&mut self) {
        self.state.is_repeat = !self.state.is_repeat;
        self.commit();
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.is_shuffle = !self.state.is_shuffle;
        self.commit();
    }

    /// Ask the parent for the next track.
    pub fn request_next(&mut self) {
        (self.navigation.on_next)();
    }

    /// Ask the parent for the previous track.
    pub fn request_previous(&mut self) {
        (self.navigation.on_previous)();
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        let stale = event.generation != self.generation || self.phase == Phase::Empty;
        match event.kind {
            // Tickets are unique across sources, so no generation check.
            DeviceEventKind::PlayResolved { ticket, result } => self.resolve_play(ticket, result),
            _ if stale => {
                tracing::trace!(generation = event.generation, "ignoring stale device event");
                return;
            }
            DeviceEventKind::MetadataLoaded { duration } => {
                if self.phase != Phase::Loading {
                    return;
                }
                self.loaded = true;
                self.phase = Phase::Ready;
                self.state.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                self.state.audio_error = None;
                if self.state.is_playing {
                    self.issue_play();
                }
            }
            DeviceEventKind::TimeUpdate { position } => {
                if self.phase != Phase::Ready {
                    return;
                }
                let duration = self.state.duration;
                self.state.current_time = if duration > 0.0 {
                    clamp_time(position, duration)
                } else {
                    clamp_time(position, f64::MAX)
                };
            }
            DeviceEventKind::Ended => {
                if self.phase != Phase::Ready || self.state.reached_end {
                    return;
                }
                self.handle_ended();
                return;
            }
            DeviceEventKind::Fault { message } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| LOAD_FAULT_FALLBACK.to_string());
                tracing::warn!(source = %self.source, %message, "audio fault");
                self.phase = Phase::Error;
                self.state.is_playing = false;
                self.pending_play = None;
                self.state.audio_error = Some(PlaybackError::LoadFault(message));
            }
        }
        self.commit();
    }

    fn handle_ended(&mut self) {
        if self.state.is_repeat {
            tracing::debug!("track ended; repeating");
            self.state.current_time = 0.0;
            self.device.submit(DeviceCommand::Seek(Duration::ZERO));
            self.state.is_playing = true;
            self.issue_play();
            self.commit();
            return;
        }

        tracing::debug!("track ended; asking for the next one");
        self.state.is_playing = false;
        self.state.current_time = 0.0;
        self.state.reached_end = true;
        self.pending_play = None;
        self.device.submit(DeviceCommand::Pause);
        self.device.submit(DeviceCommand::Seek(Duration::ZERO));
        // Publish first so the parent sees the paused state when it reacts.
        self.commit();
        (self.navigation.on_next)();
    }

    fn resolve_play(&mut self, ticket: PlayTicket, result: Result<(), String>) {
        if self.pending_play != Some(ticket) {
            // Superseded by a pause or a new source. If the device started
            // anyway, bring it back in line with what was asked for.
            if result.is_ok() && !self.state.is_playing && self.phase != Phase::Empty {
                self.device.submit(DeviceCommand::Pause);
            }
            return;
        }
        self.pending_play = None;
        match result {
            Ok(()) => {
                if self.phase == Phase::Error && self.loaded {
                    self.phase = Phase::Ready;
                }
                if matches!(self.state.audio_error, Some(PlaybackError::PlaybackRejected(_))) {
                    self.state.audio_error = None;
                }
            }
            Err(reason) => {
                let reason = if reason.trim().is_empty() {
                    PLAY_REJECTED_FALLBACK.to_string()
                } else {
                    reason
                };
                tracing::warn!(source = %self.source, %reason, "playback rejected");
                self.phase = Phase::Error;
                self.state.is_playing = false;
                self.state.audio_error = Some(PlaybackError::PlaybackRejected(reason));
            }
        }
    }

    fn issue_play(&mut self) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending_play = Some(ticket);
        self.device.submit(DeviceCommand::Play { ticket });
    }

    fn apply_volume(&mut self) {
        self.device
            .submit(DeviceCommand::SetVolume(self.state.effective_volume()));
    }

    fn compute_status(&self) -> PlayerStatus {
        match self.phase {
            Phase::Empty => PlayerStatus::Empty,
            Phase::Loading => PlayerStatus::Loading,
            Phase::Error => PlayerStatus::Error,
            Phase::Ready if self.state.is_playing => PlayerStatus::Playing,
            Phase::Ready => PlayerStatus::Paused,
        }
    }

    /// Refresh the derived status and notify observers of any change.
    fn commit(&mut self) {
        self.state.status = self.compute_status();
        if self.state != self.published {
            self.published = self.state.clone();
            let snapshot = &self.published;
            self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}
