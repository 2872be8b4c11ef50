//! Media-key integration over D-Bus (MPRIS).
//!
//! Remote calls are turned into [`ControlCmd`]s for the event loop; the loop
//! pushes status and metadata back through an [`MprisHandle`]. Failing to
//! reach the session bus only disables the integration.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::audio::PlayerStatus;
use crate::library::TrackDescriptor;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.legato";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek, in microseconds.
    Seek(i64),
    /// Absolute position in microseconds, for the track with this catalog index.
    SetPosition { index: usize, micros: i64 },
}

#[derive(Debug, Default)]
struct SharedState {
    status: PlayerStatus,
    track_id: Option<OwnedObjectPath>,
    title: Option<String>,
    artist: Vec<String>,
    art_url: Option<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
}

/// What MPRIS clients see of one track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackMetadata<'a> {
    /// Catalog position, used for the track object path.
    pub index: usize,
    pub track: Option<&'a TrackDescriptor>,
    /// Resolved source URL.
    pub url: &'a str,
    /// Seconds; 0 when unknown.
    pub duration: f64,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    pub fn set_status(&self, status: PlayerStatus) {
        let changed = match self.state.lock() {
            Ok(mut s) if s.status != status => {
                s.status = status;
                true
            }
            _ => false,
        };
        if changed {
            let _ = self.notify.send(());
        }
    }

    /// Position is polled by clients, so updating it sends no signal.
    pub fn set_position(&self, seconds: f64) {
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = seconds_to_micros(seconds);
        }
    }

    /// Replace the exported metadata; `None` clears it.
    pub fn set_track_metadata(&self, meta: Option<TrackMetadata<'_>>) {
        if let Ok(mut s) = self.state.lock() {
            let track = meta.as_ref().and_then(|m| m.track);
            s.track_id = meta.as_ref().and_then(|m| {
                ObjectPath::try_from(format!("{OBJECT_PATH}/track/{}", m.index))
                    .ok()
                    .map(OwnedObjectPath::from)
            });
            s.title = track.map(|t| t.title.clone()).filter(|t| !t.trim().is_empty());
            s.artist = track
                .map(|t| t.artist.trim())
                .filter(|a| !a.is_empty())
                .map(|a| vec![a.to_string()])
                .unwrap_or_default();
            s.art_url = track
                .map(|t| t.cover_image.clone())
                .filter(|c| !c.trim().is_empty());
            s.url = meta
                .as_ref()
                .map(|m| m.url.to_string())
                .filter(|u| !u.is_empty());
            s.length_micros = meta
                .as_ref()
                .filter(|m| m.duration.is_finite() && m.duration > 0.0)
                .map(|m| seconds_to_micros(m.duration));
        }
        let _ = self.notify.send(());
    }
}

fn mpris_status(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Playing => "Playing",
        PlayerStatus::Paused | PlayerStatus::Loading => "Paused",
        PlayerStatus::Empty | PlayerStatus::Error => "Stopped",
    }
}

fn seconds_to_micros(seconds: f64) -> i64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1_000_000.0) as i64
    } else {
        0
    }
}

/// Catalog index encoded in a track object path, if it is one of ours.
fn track_index(path: &ObjectPath<'_>) -> Option<usize> {
    path.as_str()
        .strip_prefix(OBJECT_PATH)?
        .strip_prefix("/track/")?
        .parse()
        .ok()
}

fn insert_value<'a>(map: &mut HashMap<String, OwnedValue>, key: &str, value: impl Into<Value<'a>>) {
    if let Ok(v) = OwnedValue::try_from(value.into()) {
        map.insert(key.to_string(), v);
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "legato"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["http".to_string(), "https".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    fn set_position(&self, track_id: ObjectPath<'_>, position: i64) {
        // Stale track ids are ignored.
        let Some(index) = track_index(&track_id) else {
            return;
        };
        let _ = self.tx.send(ControlCmd::SetPosition {
            index,
            micros: position,
        });
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        mpris_status(s.status)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        if let Some(id) = s.track_id.as_ref() {
            insert_value(&mut map, "mpris:trackid", id.clone().into_inner());
        }
        if let Some(title) = s.title.as_deref() {
            insert_value(&mut map, "xesam:title", title);
        }
        if !s.artist.is_empty() {
            insert_value(&mut map, "xesam:artist", s.artist.clone());
        }
        if let Some(art) = s.art_url.as_deref() {
            insert_value(&mut map, "mpris:artUrl", art);
        }
        if let Some(url) = s.url.as_deref() {
            insert_value(&mut map, "xesam:url", url);
        }
        if let Some(len) = s.length_micros {
            insert_value(&mut map, "mpris:length", len);
        }
        map
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;
    let player = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    tracing::info!(name = BUS_NAME, "MPRIS service registered");

    // Keep the service alive and forward state changes as PropertiesChanged.
    loop {
        Timer::after(Duration::from_millis(250)).await;
        let mut changed = false;
        loop {
            match notify.try_recv() {
                Ok(()) => changed = true,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if changed {
            let emitter = player.signal_emitter();
            let iface = player.get().await;
            iface.playback_status_changed(emitter).await?;
            iface.metadata_changed(emitter).await?;
        }
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
            tracing::warn!(error = %e, "MPRIS unavailable");
        }
    });

    MprisHandle {
        state,
        notify: notify_tx,
    }
}
