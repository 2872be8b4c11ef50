//! Transport controls: discrete user gestures in, engine calls out, plus the
//! derived values the player bar renders.

use ratatui::layout::Rect;

use crate::audio::{OutputDevice, PlaybackEngine, PlaybackState};

/// Everything a user (keyboard, mouse or media keys) can ask of the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    TogglePlay,
    Play,
    Pause,
    /// Pause and rewind to the start.
    Stop,
    /// Absolute position in seconds.
    SeekTo(f64),
    /// Position as a fraction of the duration.
    SeekFraction(f64),
    /// Relative seek in seconds.
    ScrubBy(f64),
    SetVolume(f32),
    VolumeBy(f32),
    ToggleMute,
    ToggleRepeat,
    ToggleShuffle,
    SkipNext,
    SkipPrevious,
}

/// Forward `gesture` to the engine.
pub fn apply<D: OutputDevice>(engine: &mut PlaybackEngine<D>, gesture: Gesture) {
    match gesture {
        Gesture::TogglePlay => engine.toggle_play(),
        Gesture::Play => engine.play(),
        Gesture::Pause => engine.pause(),
        Gesture::Stop => {
            engine.pause();
            engine.seek(0.0);
        }
        Gesture::SeekTo(time) => engine.seek(time),
        Gesture::SeekFraction(fraction) => {
            let duration = engine.state().duration;
            engine.seek(seek_time(fraction, duration));
        }
        Gesture::ScrubBy(delta) => engine.seek_by(delta),
        Gesture::SetVolume(volume) => engine.set_volume(volume),
        Gesture::VolumeBy(delta) => {
            let volume = engine.state().volume;
            engine.set_volume(volume + delta);
        }
        Gesture::ToggleMute => engine.toggle_mute(),
        Gesture::ToggleRepeat => engine.toggle_repeat(),
        Gesture::ToggleShuffle => engine.toggle_shuffle(),
        Gesture::SkipNext => engine.request_next(),
        Gesture::SkipPrevious => engine.request_previous(),
    }
}

/// `current / duration` in `[0, 1]`; 0 while the duration is unknown.
pub fn progress_fraction(current: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || current.is_nan() {
        return 0.0;
    }
    (current / duration).clamp(0.0, 1.0)
}

/// Time for a fraction of the track, with the fraction clamped to `[0, 1]`.
pub fn seek_time(fraction: f64, duration: f64) -> f64 {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    fraction * duration
}

/// Where a click at `column` lands on a horizontal `bar`, clamped to `[0, 1]`.
pub fn pointer_fraction(column: u16, bar: Rect) -> f64 {
    if bar.width == 0 {
        return 0.0;
    }
    let offset = column.saturating_sub(bar.x) as f64;
    (offset / bar.width as f64).clamp(0.0, 1.0)
}

/// `m:ss`; anything non-finite (or negative) shows as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// `"2:05 / 5:00"` style label for the player bar.
pub fn time_label(state: &PlaybackState, separator: &str) -> String {
    format!(
        "{}{}{}",
        format_time(state.current_time),
        separator,
        format_time(state.duration)
    )
}
