//! Wiring: settings, logging, catalog, device, engine, app, MPRIS and the
//! terminal, then the event loop.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::audio::RodioDevice;
use crate::library::load_or_fallback;
use crate::logging;
use crate::mpris::ControlCmd;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;


/// Run the player. `catalog` overrides the configured catalog file.
pub fn run(catalog: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let (settings, settings_warning) = settings::load_settings();
    logging::init(&settings);
    if let Some(warning) = settings_warning {
        tracing::warn!("{warning}");
    }

    let catalog_path = catalog.or_else(|| settings.catalog_path());
    let tracks = load_or_fallback(catalog_path.as_deref());

    let (device, device_events) = RodioDevice::open(&settings)?;
    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mut engine = startup::build_engine(device, &settings, control_tx.clone());
    let mut app = startup::build_app(tracks, &settings);
    let mpris = crate::mpris::spawn_mpris(control_tx);
    let mut mpris_sync = mpris_sync::MprisSync::new(engine.subscribe());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &mut engine,
        &device_events,
        &mpris,
        &mut mpris_sync,
        &control_rx,
        &mut state,
    );

    engine
        .device_mut()
        .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    tracing::info!("bye");

    run_result
}
