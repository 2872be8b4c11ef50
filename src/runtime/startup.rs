use std::sync::mpsc::Sender;

use crate::app::App;
use crate::audio::{EngineOptions, Navigation, OutputDevice, PlaybackEngine};
use crate::config;
use crate::library::TrackDescriptor;
use crate::mpris::ControlCmd;
use crate::navigator::Navigator;
use crate::resolver::UrlResolver;

/// Engine over `device` whose skip requests (and end-of-track) arrive on the
/// control channel as `Next` / `Prev`.
pub fn build_engine<D: OutputDevice>(
    device: D,
    settings: &config::Settings,
    control_tx: Sender<ControlCmd>,
) -> PlaybackEngine<D> {
    let mut engine = PlaybackEngine::new(
        device,
        UrlResolver::new(&settings.stream.base_url),
        EngineOptions::from_settings(settings),
    );
    let prev_tx = control_tx.clone();
    engine.set_navigation(Navigation::new(
        move || {
            let _ = control_tx.send(ControlCmd::Next);
        },
        move || {
            let _ = prev_tx.send(ControlCmd::Prev);
        },
    ));
    engine
}

pub fn build_app(tracks: Vec<TrackDescriptor>, settings: &config::Settings) -> App {
    let mut app = App::new(
        tracks,
        &settings.ui,
        Navigator::new(settings.playback.wrap_around),
    );
    // Playback defaults
    app.set_shuffle(settings.playback.shuffle);
    app
}
