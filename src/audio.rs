//! Audio playback.
//!
//! [`PlaybackEngine`] is the single owner of playback state. It talks to one
//! [`OutputDevice`] through fire-and-forget [`DeviceCommand`]s and learns what
//! happened from [`DeviceEvent`]s, which the runtime feeds back in on the UI
//! thread. [`RodioDevice`] is the real device: a worker thread around a
//! `rodio` sink that fetches sources over HTTP or from disk.

mod device;
mod engine;
mod error;
mod fetch;
mod player;
mod sink;
mod thread;
mod types;

pub use device::OutputDevice;
pub use engine::{EngineOptions, Navigation, PlaybackEngine};
pub use error::PlaybackError;
pub use player::RodioDevice;
pub use types::{DeviceCommand, DeviceEvent, DeviceEventKind, PlaybackState, PlayerStatus};

#[cfg(test)]
mod tests;
