use std::sync::mpsc::Receiver;

use crate::app::App;
use crate::audio::{OutputDevice, PlaybackEngine, PlaybackState, PlayerStatus};
use crate::mpris::{MprisHandle, TrackMetadata};

/// Forwards engine snapshots to MPRIS. Time updates only move the polled
/// position; status, duration and track changes republish metadata.
pub struct MprisSync {
    updates: Receiver<PlaybackState>,
    published: Option<(PlayerStatus, Option<usize>, f64)>,
}

impl MprisSync {
    pub fn new(updates: Receiver<PlaybackState>) -> Self {
        Self {
            updates,
            published: None,
        }
    }

    pub fn pump<D: OutputDevice>(
        &mut self,
        mpris: &MprisHandle,
        app: &App,
        engine: &PlaybackEngine<D>,
    ) {
        if let Some(latest) = self.updates.try_iter().last() {
            mpris.set_position(latest.current_time);
        }
        let state = engine.state();
        let key = (state.status, app.now_playing, state.duration);
        if self.published != Some(key) {
            update_mpris(mpris, app, engine);
            self.published = Some(key);
        }
    }
}

fn update_mpris<D: OutputDevice>(mpris: &MprisHandle, app: &App, engine: &PlaybackEngine<D>) {
    let meta = app.now_playing.map(|index| TrackMetadata {
        index,
        track: app.tracks.get(index),
        url: engine.source(),
        duration: engine.state().duration,
    });
    mpris.set_track_metadata(meta);
    mpris.set_status(engine.status());
}
