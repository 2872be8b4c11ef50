use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::layout::Position;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{DeviceEvent, OutputDevice, PlaybackEngine, RodioDevice};
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::MprisSync;
use crate::transport::{Gesture, apply, pointer_fraction};
use crate::ui::{self, HitAreas};

/// Whether the loop keeps going after an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Where the progress and volume bars were last drawn.
    pub hits: HitAreas,
}

/// Main terminal event loop: handles input, UI drawing, device events and
/// MPRIS. Returns `Ok(())` when shutdown is requested; the caller fades out.
#[allow(clippy::too_many_arguments)]
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<RodioDevice>,
    device_events: &mpsc::Receiver<DeviceEvent>,
    mpris: &MprisHandle,
    mpris_sync: &mut MprisSync,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        // Device notifications first: they may post Next/Prev requests.
        while let Ok(ev) = device_events.try_recv() {
            engine.handle_device_event(ev);
        }

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, app, engine) == Flow::Quit {
                return Ok(());
            }
        }

        // Keep MPRIS in sync even when playback changes come from media keys or auto-advance.
        mpris_sync.pump(mpris, app, engine);

        let display = app.display_indices();
        let playback = engine.state().clone();
        let mut hits = state.hits;
        terminal.draw(|f| {
            hits = ui::draw(f, app, &playback, &display, &settings.ui, &settings.controls);
        })?;
        state.hits = hits;

        if event::poll(Duration::from_millis(50))? {
            let flow = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(key, settings, app, engine, state)
                }
                Event::Mouse(mouse) => {
                    handle_mouse_event(mouse, engine, state.hits);
                    Flow::Continue
                }
                _ => Flow::Continue,
            };
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }
}

/// Hand the cursor's track to the engine, starting it when configured to.
pub fn start_selected<D: OutputDevice>(
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<D>,
) {
    match app.play_selected() {
        Some(i) => {
            engine.load_track(app.tracks.get(i));
            if settings.playback.autoplay_on_select {
                engine.play();
            }
        }
        // Nothing visible: let the engine report that nothing is selected.
        None if app.now_playing.is_none() => engine.play(),
        None => {}
    }
}

/// Answer the engine's request for another track.
pub fn advance<D: OutputDevice>(
    forward: bool,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<D>,
) {
    let was_playing = engine.state().is_playing;
    let ended = engine.state().reached_end;
    let picked = if forward {
        app.next_track()
    } else {
        app.previous_track()
    };
    let Some(index) = picked else {
        tracing::debug!(forward, "no track to move to");
        return;
    };
    engine.load_track(app.tracks.get(index));
    if was_playing || (ended && settings.playback.continue_after_end) {
        engine.play();
    }
}

fn play_or_start<D: OutputDevice>(
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<D>,
    gesture: Gesture,
) {
    if app.now_playing.is_none() {
        start_selected(settings, app, engine);
    } else {
        apply(engine, gesture);
    }
}

pub fn handle_control_cmd<D: OutputDevice>(
    cmd: ControlCmd,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<D>,
) -> Flow {
    match cmd {
        ControlCmd::Quit => return Flow::Quit,
        ControlCmd::Play => play_or_start(settings, app, engine, Gesture::Play),
        ControlCmd::PlayPause => play_or_start(settings, app, engine, Gesture::TogglePlay),
        ControlCmd::Pause => apply(engine, Gesture::Pause),
        ControlCmd::Stop => apply(engine, Gesture::Stop),
        ControlCmd::Next => advance(true, settings, app, engine),
        ControlCmd::Prev => advance(false, settings, app, engine),
        ControlCmd::Seek(offset) => apply(engine, Gesture::ScrubBy(offset as f64 / 1_000_000.0)),
        ControlCmd::SetPosition { index, micros } => {
            if app.now_playing == Some(index) && micros >= 0 {
                apply(engine, Gesture::SeekTo(micros as f64 / 1_000_000.0));
            }
        }
    }
    Flow::Continue
}

pub fn handle_mouse_event<D: OutputDevice>(
    mouse: MouseEvent,
    engine: &mut PlaybackEngine<D>,
    hits: HitAreas,
) {
    if !matches!(
        mouse.kind,
        MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left)
    ) {
        return;
    }
    let at = Position::new(mouse.column, mouse.row);
    if hits.progress.contains(at) {
        apply(
            engine,
            Gesture::SeekFraction(pointer_fraction(mouse.column, hits.progress)),
        );
    } else if hits.volume.contains(at) {
        let fraction = pointer_fraction(mouse.column, hits.volume) as f32;
        apply(engine, Gesture::SetVolume(fraction));
    }
}

fn handle_filter_key<D: OutputDevice>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<D>,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Char('j') | KeyCode::Char('n') if ctrl => app.next(),
        KeyCode::Char('k') | KeyCode::Char('p') if ctrl => app.prev(),
        KeyCode::Char(c) => {
            if !c.is_control() {
                app.push_filter_char(c);
            }
        }
        KeyCode::Enter => {
            if app.display_indices().is_empty() {
                return;
            }
            app.exit_filter_mode();
            start_selected(settings, app, engine);
        }
        _ => {}
    }
}

pub fn handle_key_event<D: OutputDevice>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut PlaybackEngine<D>,
    state: &mut EventLoopState,
) -> Flow {
    if app.filter_mode {
        state.pending_gg = false;
        handle_filter_key(key, settings, app, engine);
        return Flow::Continue;
    }

    // g pending should clear on anything but a second g.
    let was_pending_gg = std::mem::take(&mut state.pending_gg);
    let scrub = settings.controls.scrub_seconds as f64;
    let step = settings.audio.volume_step;

    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('g') => {
            if was_pending_gg {
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => start_selected(settings, app, engine),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            play_or_start(settings, app, engine, Gesture::TogglePlay)
        }
        KeyCode::Char('l') => apply(engine, Gesture::SkipNext),
        KeyCode::Char('h') => apply(engine, Gesture::SkipPrevious),
        KeyCode::Char('L') => apply(engine, Gesture::ScrubBy(scrub)),
        KeyCode::Char('H') => apply(engine, Gesture::ScrubBy(-scrub)),
        KeyCode::Char('+') | KeyCode::Char('=') => apply(engine, Gesture::VolumeBy(step)),
        KeyCode::Char('-') => apply(engine, Gesture::VolumeBy(-step)),
        KeyCode::Char('m') => apply(engine, Gesture::ToggleMute),
        KeyCode::Char('r') => apply(engine, Gesture::ToggleRepeat),
        KeyCode::Char('s') => {
            apply(engine, Gesture::ToggleShuffle);
            app.set_shuffle(engine.state().is_shuffle);
        }
        KeyCode::Char('c') => app.cycle_category(),
        KeyCode::Char('f') => {
            app.toggle_favorite();
        }
        KeyCode::Char('v') => {
            app.toggle_like();
        }
        _ => {}
    }
    Flow::Continue
}
