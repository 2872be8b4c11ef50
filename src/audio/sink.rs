//! Utilities for creating `rodio` sinks from fetched media.
//!
//! The helper here decodes an in-memory copy of the source and prepares a
//! paused `Sink` at the requested start position.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use super::error::DeviceError;
use super::fetch::LoadedMedia;

/// Create a paused `Sink` for `media` that starts playback at `start_at`.
///
/// Also returns the decoder's own idea of the total duration, which some
/// formats do not provide.
pub(super) fn create_sink_at(
    handle: &OutputStream,
    media: &LoadedMedia,
    start_at: Duration,
    volume: f32,
) -> Result<(Sink, Option<Duration>), DeviceError> {
    let decoder = Decoder::new(Cursor::new(media.bytes.clone()))
        .map_err(|e| DeviceError::Decode(e.to_string()))?;
    let total = decoder.total_duration();
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = decoder.skip_duration(start_at);

    let sink = Sink::connect_new(handle.mixer());
    sink.set_volume(volume);
    sink.append(source);
    sink.pause();
    Ok((sink, total))
}

/// Ramp `sink` down to silence over `fade_out_ms`, blocking the caller.
pub(super) fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    let start = sink.volume();
    if fade_out_ms == 0 || start <= 0.0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(start * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
