use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::library::TrackDescriptor;
use crate::resolver::UrlResolver;

use super::engine::clamp_time;
use super::error::{DeviceError, PLAY_REJECTED_FALLBACK};
use super::fetch::{FetchConfig, fetch_media, container_duration};
use super::thread::{LoadGate, PlayGate, Playhead};
use super::{
    DeviceCommand, DeviceEvent, DeviceEventKind, EngineOptions, Navigation, OutputDevice,
    PlaybackEngine, PlaybackError, PlayerStatus,
};

#[derive(Default)]
struct RecordingDevice {
    commands: Vec<DeviceCommand>,
}

impl OutputDevice for RecordingDevice {
    fn submit(&mut self, command: DeviceCommand) {
        self.commands.push(command);
    }
}

impl RecordingDevice {
    fn take(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    fn last_ticket(&self) -> Option<u64> {
        self.commands.iter().rev().find_map(|c| match c {
            DeviceCommand::Play { ticket } => Some(*ticket),
            _ => None,
        })
    }
}

const BASE: &str = "https://cdn.example.com";

fn engine() -> PlaybackEngine<RecordingDevice> {
    engine_with(EngineOptions::default())
}

fn engine_with(options: EngineOptions) -> PlaybackEngine<RecordingDevice> {
    let mut engine = PlaybackEngine::new(RecordingDevice::default(), UrlResolver::new(BASE), options);
    engine.device_mut().take();
    engine
}

fn event(generation: u64, kind: DeviceEventKind) -> DeviceEvent {
    DeviceEvent::new(generation, kind)
}

fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
    let count = Rc::new(Cell::new(0));
    let inner = count.clone();
    (count, move || inner.set(inner.get() + 1))
}

/// Engine with `song.mp3` loaded and ready, `duration` seconds long.
fn ready(duration: f64) -> PlaybackEngine<RecordingDevice> {
    let mut e = engine();
    e.load_source("/song.mp3");
    e.handle_device_event(event(1, DeviceEventKind::MetadataLoaded { duration }));
    e.device_mut().take();
    e
}

fn resolve_last(e: &mut PlaybackEngine<RecordingDevice>, result: Result<(), String>) {
    let ticket = e.device().last_ticket().expect("a play was issued");
    e.handle_device_event(event(1, DeviceEventKind::PlayResolved { ticket, result }));
}

#[test]
fn new_engine_is_empty_and_sets_device_volume() {
    let mut e = PlaybackEngine::new(
        RecordingDevice::default(),
        UrlResolver::new(BASE),
        EngineOptions {
            volume: 0.7,
            ..EngineOptions::default()
        },
    );
    assert_eq!(e.status(), PlayerStatus::Empty);
    assert_eq!(e.state().current_time, 0.0);
    assert_eq!(e.state().duration, 0.0);
    assert!(!e.state().is_playing);
    assert_eq!(e.device_mut().take(), vec![DeviceCommand::SetVolume(0.7)]);
}

#[test]
fn play_without_source_reports_no_song_selected() {
    let mut e = engine();
    e.play();

    assert_eq!(e.state().audio_error, Some(PlaybackError::NoSourceSelected));
    assert_eq!(e.audio_error(), "No song selected");
    assert!(!e.state().is_playing);
    assert_eq!(e.status(), PlayerStatus::Empty);
    assert!(e.device().commands.is_empty());
}

#[test]
fn assigning_a_source_resolves_and_loads_it() {
    let mut e = engine();
    e.load_source("/songs/a b.mp3");

    assert_eq!(e.status(), PlayerStatus::Loading);
    assert_eq!(e.source(), "https://cdn.example.com/songs/a%20b.mp3");
    assert_eq!(
        e.device_mut().take(),
        vec![DeviceCommand::Load {
            source: "https://cdn.example.com/songs/a%20b.mp3".into(),
            generation: 1,
        }]
    );
}

#[test]
fn load_track_uses_the_audio_src() {
    let mut e = engine();
    let track = TrackDescriptor {
        audio_src: "https://x.test/a.mp3".into(),
        ..TrackDescriptor::default()
    };
    e.load_track(Some(&track));
    assert_eq!(e.source(), "https://x.test/a.mp3");

    e.load_track(None);
    assert_eq!(e.status(), PlayerStatus::Empty);
    assert_eq!(e.source(), "");
}

#[test]
fn reassigning_the_same_source_is_a_no_op() {
    let mut e = ready(200.0);
    e.load_source("/song.mp3");
    assert_eq!(e.status(), PlayerStatus::Paused);
    assert!(e.device().commands.is_empty());
}

#[test]
fn metadata_moves_to_ready_paused_with_duration() {
    let e = ready(245.0);
    assert_eq!(e.status(), PlayerStatus::Paused);
    assert_eq!(e.state().duration, 245.0);
    assert_eq!(e.state().current_time, 0.0);
}

#[test]
fn non_finite_duration_is_treated_as_unknown() {
    let e = ready(f64::NAN);
    assert_eq!(e.state().duration, 0.0);
    let e = ready(f64::INFINITY);
    assert_eq!(e.state().duration, 0.0);
}

#[test]
fn play_while_loading_waits_for_metadata() {
    let mut e = engine();
    e.load_source("/song.mp3");
    e.device_mut().take();

    e.play();
    assert!(e.state().is_playing);
    assert_eq!(e.status(), PlayerStatus::Loading);
    assert!(e.device().last_ticket().is_none());

    e.handle_device_event(event(1, DeviceEventKind::MetadataLoaded { duration: 100.0 }));
    assert_eq!(e.status(), PlayerStatus::Playing);
    assert!(e.device().last_ticket().is_some());
}

#[test]
fn play_then_successful_resolution_is_playing() {
    let mut e = ready(100.0);
    e.play();
    assert_eq!(e.status(), PlayerStatus::Playing);
    resolve_last(&mut e, Ok(()));
    assert_eq!(e.status(), PlayerStatus::Playing);
    assert!(e.state().audio_error.is_none());
}

#[test]
fn playing_twice_issues_a_single_play() {
    let mut e = ready(100.0);
    e.play();
    e.play();
    let plays = e
        .device()
        .commands
        .iter()
        .filter(|c| matches!(c, DeviceCommand::Play { .. }))
        .count();
    assert_eq!(plays, 1);
}

#[test]
fn rejected_play_surfaces_the_reason_and_stops() {
    let mut e = ready(100.0);
    e.play();
    resolve_last(&mut e, Err("autoplay blocked".into()));

    assert_eq!(e.status(), PlayerStatus::Error);
    assert!(!e.state().is_playing);
    assert_eq!(
        e.state().audio_error,
        Some(PlaybackError::PlaybackRejected("autoplay blocked".into()))
    );
    assert_eq!(e.audio_error(), "autoplay blocked");
}

#[test]
fn rejected_play_without_reason_uses_fallback() {
    let mut e = ready(100.0);
    e.play();
    resolve_last(&mut e, Err(String::new()));
    assert_eq!(e.audio_error(), PLAY_REJECTED_FALLBACK);
}

#[test]
fn retrying_after_rejection_recovers() {
    let mut e = ready(100.0);
    e.play();
    resolve_last(&mut e, Err("busy".into()));
    e.play();
    resolve_last(&mut e, Ok(()));
    assert_eq!(e.status(), PlayerStatus::Playing);
    assert!(e.state().audio_error.is_none());
}

#[test]
fn pause_supersedes_an_outstanding_play() {
    let mut e = ready(100.0);
    e.play();
    let ticket = e.device().last_ticket().unwrap();
    e.pause();
    e.device_mut().take();

    e.handle_device_event(event(
        1,
        DeviceEventKind::PlayResolved {
            ticket,
            result: Ok(()),
        },
    ));
    assert!(!e.state().is_playing);
    assert_eq!(e.status(), PlayerStatus::Paused);
    assert_eq!(e.device_mut().take(), vec![DeviceCommand::Pause]);
}

#[test]
fn late_rejection_after_pause_is_ignored() {
    let mut e = ready(100.0);
    e.play();
    let ticket = e.device().last_ticket().unwrap();
    e.pause();
    e.handle_device_event(event(
        1,
        DeviceEventKind::PlayResolved {
            ticket,
            result: Err("late".into()),
        },
    ));
    assert_eq!(e.status(), PlayerStatus::Paused);
    assert!(e.state().audio_error.is_none());
}

#[test]
fn toggle_play_flips_requested_state() {
    let mut e = ready(100.0);
    e.toggle_play();
    assert!(e.state().is_playing);
    e.toggle_play();
    assert!(!e.state().is_playing);
    assert_eq!(e.device().commands.last(), Some(&DeviceCommand::Pause));
}

#[test]
fn time_updates_are_clamped_to_duration() {
    let mut e = ready(100.0);
    e.handle_device_event(event(1, DeviceEventKind::TimeUpdate { position: 42.5 }));
    assert_eq!(e.state().current_time, 42.5);
    e.handle_device_event(event(1, DeviceEventKind::TimeUpdate { position: 130.0 }));
    assert_eq!(e.state().current_time, 100.0);
    e.handle_device_event(event(1, DeviceEventKind::TimeUpdate { position: f64::NAN }));
    assert_eq!(e.state().current_time, 0.0);
}

#[test]
fn events_from_a_replaced_source_are_ignored() {
    let mut e = engine();
    e.load_source("/a.mp3");
    e.load_source("/b.mp3");

    e.handle_device_event(event(1, DeviceEventKind::MetadataLoaded { duration: 10.0 }));
    assert_eq!(e.status(), PlayerStatus::Loading);
    e.handle_device_event(event(1, DeviceEventKind::Fault { message: None }));
    assert_eq!(e.status(), PlayerStatus::Loading);
    assert!(e.state().audio_error.is_none());

    e.handle_device_event(event(2, DeviceEventKind::MetadataLoaded { duration: 20.0 }));
    assert_eq!(e.status(), PlayerStatus::Paused);
    assert_eq!(e.state().duration, 20.0);
}

#[test]
fn seek_clamps_into_range() {
    let mut e = ready(240.0);

    e.seek(120.0);
    assert_eq!(e.state().current_time, 120.0);
    assert_eq!(
        e.device().commands.last(),
        Some(&DeviceCommand::Seek(Duration::from_secs(120)))
    );

    e.seek(-5.0);
    assert_eq!(e.state().current_time, 0.0);
    e.seek(f64::INFINITY);
    assert_eq!(e.state().current_time, 240.0);
    e.seek(f64::NAN);
    assert_eq!(e.state().current_time, 0.0);
}

#[test]
fn seek_before_ready_does_nothing() {
    let mut e = engine();
    e.seek(10.0);
    assert!(e.device().commands.is_empty());

    e.load_source("/a.mp3");
    e.device_mut().take();
    e.seek(10.0);
    assert!(e.device().commands.is_empty());
    assert_eq!(e.state().current_time, 0.0);
}

#[test]
fn seek_by_moves_relative_to_current_time() {
    let mut e = ready(100.0);
    e.seek(50.0);
    e.seek_by(5.0);
    assert_eq!(e.state().current_time, 55.0);
    e.seek_by(-500.0);
    assert_eq!(e.state().current_time, 0.0);
}

#[test]
fn clamp_time_handles_non_finite_values() {
    assert_eq!(clamp_time(f64::NAN, 10.0), 0.0);
    assert_eq!(clamp_time(f64::INFINITY, 10.0), 10.0);
    assert_eq!(clamp_time(f64::NEG_INFINITY, 10.0), 0.0);
    assert_eq!(clamp_time(3.0, 10.0), 3.0);
}

#[test]
fn volume_is_clamped_and_zero_mutes() {
    let mut e = engine();
    e.set_volume(1.7);
    assert_eq!(e.state().volume, 1.0);
    e.set_volume(-0.2);
    assert_eq!(e.state().volume, 0.0);
    assert!(e.state().is_muted);
    e.set_volume(f32::NAN);
    assert_eq!(e.state().volume, 0.0);
}

#[test]
fn muting_silences_the_device_but_keeps_volume() {
    let mut e = engine();
    e.set_volume(0.8);
    e.device_mut().take();

    e.toggle_mute();
    assert!(e.state().is_muted);
    assert_eq!(e.state().volume, 0.8);
    assert_eq!(e.device_mut().take(), vec![DeviceCommand::SetVolume(0.0)]);

    e.toggle_mute();
    assert!(!e.state().is_muted);
    assert_eq!(e.state().volume, 0.8);
    assert_eq!(e.device_mut().take(), vec![DeviceCommand::SetVolume(0.8)]);
}

#[test]
fn unmuting_from_zero_restores_the_default_level() {
    let mut e = engine();
    e.set_volume(0.0);
    assert!(e.state().is_muted);
    e.toggle_mute();
    assert!(!e.state().is_muted);
    assert_eq!(e.state().volume, 0.5);
}

#[test]
fn toggles_persist_across_tracks() {
    let mut e = engine();
    e.toggle_repeat();
    e.toggle_shuffle();
    e.set_volume(0.3);
    e.load_source("/a.mp3");
    e.load_source("/b.mp3");
    assert!(e.state().is_repeat);
    assert!(e.state().is_shuffle);
    assert_eq!(e.state().volume, 0.3);
    e.toggle_repeat();
    assert!(!e.state().is_repeat);
}

#[test]
fn end_without_repeat_asks_for_next_once() {
    let (count, on_next) = counter();
    let mut e = ready(100.0);
    e.set_navigation(Navigation::new(on_next, || {}));
    e.play();
    resolve_last(&mut e, Ok(()));
    e.handle_device_event(event(1, DeviceEventKind::TimeUpdate { position: 99.0 }));

    e.handle_device_event(event(1, DeviceEventKind::Ended));
    assert_eq!(count.get(), 1);
    assert!(!e.state().is_playing);
    assert_eq!(e.state().current_time, 0.0);
    assert!(e.state().reached_end);
    assert_eq!(e.status(), PlayerStatus::Paused);

    e.handle_device_event(event(1, DeviceEventKind::Ended));
    assert_eq!(count.get(), 1);

    e.play();
    e.handle_device_event(event(1, DeviceEventKind::Ended));
    assert_eq!(count.get(), 2);
}

#[test]
fn end_with_repeat_restarts_without_navigating() {
    let (count, on_next) = counter();
    let mut e = ready(100.0);
    e.set_navigation(Navigation::new(on_next, || {}));
    e.toggle_repeat();
    e.play();
    resolve_last(&mut e, Ok(()));
    e.device_mut().take();

    e.handle_device_event(event(1, DeviceEventKind::Ended));
    assert_eq!(count.get(), 0);
    assert!(e.state().is_playing);
    assert_eq!(e.state().current_time, 0.0);
    let cmds = e.device_mut().take();
    assert_eq!(cmds[0], DeviceCommand::Seek(Duration::ZERO));
    assert!(matches!(cmds[1], DeviceCommand::Play { .. }));
}

#[test]
fn skip_requests_reach_the_parent() {
    let (next, on_next) = counter();
    let (prev, on_prev) = counter();
    let mut e = engine();
    e.set_navigation(Navigation::new(on_next, on_prev));
    e.request_next();
    e.request_previous();
    e.request_previous();
    assert_eq!(next.get(), 1);
    assert_eq!(prev.get(), 2);
}

#[test]
fn fault_without_message_uses_fallback() {
    let mut e = engine();
    e.load_source("/broken.mp3");
    e.play();
    e.handle_device_event(event(1, DeviceEventKind::Fault { message: None }));

    assert_eq!(e.status(), PlayerStatus::Error);
    assert!(!e.state().is_playing);
    assert_eq!(e.audio_error(), "Error loading audio");
}

#[test]
fn fault_keeps_the_device_message() {
    let mut e = engine();
    e.load_source("/broken.mp3");
    e.handle_device_event(event(
        1,
        DeviceEventKind::Fault {
            message: Some("server answered 404".into()),
        },
    ));
    assert_eq!(
        e.state().audio_error,
        Some(PlaybackError::LoadFault("server answered 404".into()))
    );
}

#[test]
fn changing_source_resets_progress_and_error() {
    let mut e = ready(100.0);
    e.seek(30.0);
    e.handle_device_event(event(1, DeviceEventKind::Fault { message: None }));
    assert_eq!(e.status(), PlayerStatus::Error);

    e.load_source("/other.mp3");
    assert_eq!(e.status(), PlayerStatus::Loading);
    assert_eq!(e.state().current_time, 0.0);
    assert_eq!(e.state().duration, 0.0);
    assert!(e.state().audio_error.is_none());
}

#[test]
fn clearing_the_source_unloads_and_stops() {
    let mut e = ready(100.0);
    e.play();
    e.load_source("");
    assert_eq!(e.status(), PlayerStatus::Empty);
    assert!(!e.state().is_playing);
    assert_eq!(e.device().commands.last(), Some(&DeviceCommand::Unload));
}

#[test]
fn observers_see_snapshots_on_change() {
    let mut e = engine();
    let rx = e.subscribe();
    assert_eq!(rx.recv().unwrap().status, PlayerStatus::Empty);

    e.load_source("/a.mp3");
    assert_eq!(rx.recv().unwrap().status, PlayerStatus::Loading);

    // No change, no snapshot.
    e.seek(5.0);
    assert!(rx.try_recv().is_err());

    e.handle_device_event(event(1, DeviceEventKind::MetadataLoaded { duration: 9.0 }));
    let snapshot = rx.recv().unwrap();
    assert_eq!(snapshot.status, PlayerStatus::Paused);
    assert_eq!(snapshot.duration, 9.0);
}

#[test]
fn dropped_observers_are_forgotten() {
    let mut e = engine();
    drop(e.subscribe());
    e.load_source("/a.mp3");
    let rx = e.subscribe();
    assert_eq!(rx.recv().unwrap().status, PlayerStatus::Loading);
}

fn fetch_config() -> FetchConfig {
    FetchConfig {
        connect_timeout: Duration::from_millis(100),
        read_timeout: Duration::from_millis(100),
    }
}

#[test]
fn fetch_reads_percent_encoded_file_urls_and_plain_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a b.mp3");
    std::fs::write(&path, b"not really audio").unwrap();

    let encoded = format!("file://{}", path.to_str().unwrap().replace(' ', "%20"));
    let media = fetch_media(&encoded, &fetch_config()).unwrap();
    assert_eq!(media.bytes.as_ref(), b"not really audio");

    let media = fetch_media(path.to_str().unwrap(), &fetch_config()).unwrap();
    assert_eq!(media.bytes.as_ref(), b"not really audio");
}

#[test]
fn fetching_a_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.mp3");
    let err = fetch_media(missing.to_str().unwrap(), &fetch_config())
        .err()
        .expect("missing file must fail");
    assert!(matches!(err, DeviceError::Io { .. }));
    assert!(err.to_string().contains("gone.mp3"));
}

#[test]
fn non_audio_bytes_have_no_container_duration() {
    assert_eq!(container_duration(b"plain text, no container"), None);
    assert_eq!(container_duration(&[]), None);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.mp3");
    std::fs::write(&path, [0u8; 64]).unwrap();
    let media = fetch_media(path.to_str().unwrap(), &fetch_config()).unwrap();
    assert_eq!(media.duration, None);
}

#[test]
fn play_during_fetch_is_held_until_it_finishes() {
    let mut gate = LoadGate::default();
    gate.begin();
    assert_eq!(gate.request(4, false), PlayGate::Held);
    assert_eq!(gate.finish(), Some(4));
    // Nothing is held twice.
    assert_eq!(gate.finish(), None);
}

#[test]
fn pause_drops_the_held_play() {
    let mut gate = LoadGate::default();
    gate.begin();
    gate.request(1, false);
    gate.drop_held();
    assert_eq!(gate.finish(), None);
}

#[test]
fn play_without_anything_loading_is_rejected() {
    let mut gate = LoadGate::default();
    assert_eq!(gate.request(2, false), PlayGate::Reject(2));
    assert_eq!(gate.request(3, true), PlayGate::Start(3));

    gate.begin();
    gate.clear();
    assert_eq!(gate.request(5, false), PlayGate::Reject(5));
}

#[test]
fn drained_sink_reports_ended_once() {
    let mut head = Playhead::default();
    assert_eq!(head.tick(false), None);

    assert!(head.start());
    assert!(!head.start());
    assert!(matches!(head.tick(false), Some(DeviceEventKind::TimeUpdate { .. })));
    assert_eq!(head.tick(true), Some(DeviceEventKind::Ended));
    assert_eq!(head.tick(true), None);
    assert!(head.is_paused());

    // Starting again (repeat) can end again.
    head.seek(Duration::ZERO);
    assert!(head.start());
    assert_eq!(head.tick(true), Some(DeviceEventKind::Ended));
}

#[test]
fn playhead_keeps_position_across_pause_and_seek() {
    let mut head = Playhead::default();
    head.seek(Duration::from_secs(30));
    assert_eq!(head.elapsed(), Duration::from_secs(30));

    head.start();
    assert!(head.pause());
    assert!(!head.pause());
    assert!(head.elapsed() >= Duration::from_secs(30));

    match head.tick(false) {
        None => {}
        other => panic!("paused playhead reported {other:?}"),
    }
}

#[test]
fn rejection_after_a_seek_still_stops_playback() {
    let mut e = ready(100.0);
    e.play();
    e.seek(40.0);
    resolve_last(&mut e, Err("device busy".into()));

    assert!(!e.state().is_playing);
    assert_eq!(e.status(), PlayerStatus::Error);
    assert_eq!(e.audio_error(), "device busy");
    assert_eq!(e.state().current_time, 40.0);
}
