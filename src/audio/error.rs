use std::path::PathBuf;

use thiserror::Error;

/// Shown when the device fails without saying why.
pub const LOAD_FAULT_FALLBACK: &str = "Error loading audio";
/// Shown when the device refuses to start without saying why.
pub const PLAY_REJECTED_FALLBACK: &str = "Playback was rejected";

/// Faults surfaced to the listener. The `Display` text is what the player
/// bar shows; none of these is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Play was requested while no song is selected.
    #[error("No song selected")]
    NoSourceSelected,
    /// The source could not be fetched or decoded.
    #[error("{0}")]
    LoadFault(String),
    /// The device refused to start playback.
    #[error("{0}")]
    PlaybackRejected(String),
}

/// Failures inside the rodio device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no audio output device: {0}")]
    NoOutput(String),
    #[error("audio worker stopped")]
    WorkerGone,
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode audio: {0}")]
    Decode(String),
}
