use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use super::error::{DeviceError, PLAY_REJECTED_FALLBACK};
use super::fetch::{FetchConfig, LoadedMedia, fetch_media};
use super::sink::{create_sink_at, fade_out_sink};
use super::types::{DeviceCommand, DeviceEvent, DeviceEventKind, Generation, PlayTicket};

/// Everything the worker thread can be woken up by.
pub(super) enum WorkerMsg {
    Command(DeviceCommand),
    Fetched {
        generation: Generation,
        result: Result<LoadedMedia, DeviceError>,
    },
    Quit {
        fade_out_ms: u64,
    },
}

#[derive(Clone, Debug)]
pub(super) struct WorkerConfig {
    pub tick: Duration,
    pub fetch: FetchConfig,
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<WorkerMsg>,
    loopback: Sender<WorkerMsg>,
    events: Sender<DeviceEvent>,
    config: WorkerConfig,
    ready: SyncSender<Result<(), DeviceError>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(DeviceError::NoOutput(e.to_string())));
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);
        let _ = ready.send(Ok(()));

        let tick = config.tick;
        let mut worker = Worker::new(&stream, events, loopback, config.fetch);
        let mut last_tick = Instant::now();

        loop {
            match rx.recv_timeout(tick) {
                Ok(WorkerMsg::Command(cmd)) => worker.handle_command(cmd),
                Ok(WorkerMsg::Fetched { generation, result }) => {
                    worker.finish_load(generation, result)
                }
                Ok(WorkerMsg::Quit { fade_out_ms }) => {
                    worker.shutdown(fade_out_ms);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    worker.shutdown(0);
                    break;
                }
            }
            if last_tick.elapsed() >= tick {
                worker.tick();
                last_tick = Instant::now();
            }
        }
        tracing::debug!("audio worker stopped");
    })
}

/// Decision for a play request, made before touching the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum PlayGate {
    Start(PlayTicket),
    /// The fetch is still running; resolved when it finishes.
    Held,
    Reject(PlayTicket),
}

/// Fetch progress of the current source and the play waiting on it.
#[derive(Debug, Default)]
pub(super) struct LoadGate {
    loading: bool,
    held: Option<PlayTicket>,
}

impl LoadGate {
    pub fn begin(&mut self) {
        self.loading = true;
        self.held = None;
    }

    pub fn clear(&mut self) {
        self.loading = false;
        self.held = None;
    }

    /// A pause supersedes the held play.
    pub fn drop_held(&mut self) {
        self.held = None;
    }

    pub fn request(&mut self, ticket: PlayTicket, ready: bool) -> PlayGate {
        if ready {
            PlayGate::Start(ticket)
        } else if self.loading {
            self.held = Some(ticket);
            PlayGate::Held
        } else {
            PlayGate::Reject(ticket)
        }
    }

    /// The fetch finished either way; hands back the play to resolve.
    pub fn finish(&mut self) -> Option<PlayTicket> {
        self.loading = false;
        self.held.take()
    }
}

/// Position bookkeeping: wall-clock start plus what accumulated while paused.
#[derive(Debug)]
pub(super) struct Playhead {
    paused: bool,
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Default for Playhead {
    fn default() -> Self {
        Self {
            paused: true,
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }
}

impl Playhead {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns true when the sink has to be started.
    pub fn start(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.started_at = Some(Instant::now());
        true
    }

    /// Returns true when the sink has to be paused.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
        self.paused = true;
        true
    }

    pub fn seek(&mut self, to: Duration) {
        self.started_at = (!self.paused).then(Instant::now);
        self.accumulated = to;
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    /// What to report on a tick. A drained sink ends playback once; the
    /// playhead then stays paused until started again.
    pub fn tick(&mut self, drained: bool) -> Option<DeviceEventKind> {
        if self.paused {
            return None;
        }
        if drained {
            self.accumulated = self.elapsed();
            self.started_at = None;
            self.paused = true;
            return Some(DeviceEventKind::Ended);
        }
        Some(DeviceEventKind::TimeUpdate {
            position: self.elapsed().as_secs_f64(),
        })
    }
}

struct Worker<'s> {
    stream: &'s OutputStream,
    events: Sender<DeviceEvent>,
    loopback: Sender<WorkerMsg>,
    fetch: FetchConfig,

    /// Source currently assigned; `None` after `Unload`.
    current: Option<Generation>,
    gate: LoadGate,
    media: Option<LoadedMedia>,
    sink: Option<Sink>,
    playhead: Playhead,
    volume: f32,
}

impl<'s> Worker<'s> {
    fn new(
        stream: &'s OutputStream,
        events: Sender<DeviceEvent>,
        loopback: Sender<WorkerMsg>,
        fetch: FetchConfig,
    ) -> Self {
        Self {
            stream,
            events,
            loopback,
            fetch,
            current: None,
            gate: LoadGate::default(),
            media: None,
            sink: None,
            playhead: Playhead::default(),
            volume: 1.0,
        }
    }

    fn handle_command(&mut self, cmd: DeviceCommand) {
        match cmd {
            DeviceCommand::Load { source, generation } => self.load(source, generation),
            DeviceCommand::Unload => {
                self.reset();
                self.current = None;
            }
            DeviceCommand::Play { ticket } => self.play(ticket),
            DeviceCommand::Pause => {
                self.gate.drop_held();
                self.pause();
            }
            DeviceCommand::Seek(to) => self.seek(to),
            DeviceCommand::SetVolume(volume) => {
                self.volume = volume;
                if let Some(sink) = self.sink.as_ref() {
                    sink.set_volume(volume);
                }
            }
        }
    }

    fn reset(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.media = None;
        self.gate.clear();
        self.playhead = Playhead::default();
    }

    fn load(&mut self, source: String, generation: Generation) {
        self.reset();
        self.current = Some(generation);
        self.gate.begin();
        tracing::debug!(%source, generation, "loading source");

        let loopback = self.loopback.clone();
        let config = self.fetch.clone();
        thread::spawn(move || {
            let result = fetch_media(&source, &config);
            let _ = loopback.send(WorkerMsg::Fetched { generation, result });
        });
    }

    fn finish_load(&mut self, generation: Generation, result: Result<LoadedMedia, DeviceError>) {
        if self.current != Some(generation) {
            tracing::trace!(generation, "dropping fetch for a replaced source");
            return;
        }
        let held = self.gate.finish();

        let prepared = result.and_then(|media| {
            let (sink, decoded) = create_sink_at(self.stream, &media, Duration::ZERO, self.volume)?;
            Ok((media, sink, decoded))
        });
        match prepared {
            Ok((media, sink, decoded)) => {
                let duration = media.duration.or(decoded).unwrap_or_default();
                self.media = Some(media);
                self.sink = Some(sink);
                self.emit(DeviceEventKind::MetadataLoaded {
                    duration: duration.as_secs_f64(),
                });
                if let Some(ticket) = held {
                    self.play(ticket);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "source failed to load");
                let message = e.to_string();
                self.emit(DeviceEventKind::Fault {
                    message: Some(message.clone()),
                });
                if let Some(ticket) = held {
                    self.resolve(ticket, Err(message));
                }
            }
        }
    }

    fn play(&mut self, ticket: PlayTicket) {
        match self.gate.request(ticket, self.sink.is_some()) {
            PlayGate::Held => {}
            PlayGate::Reject(ticket) => {
                self.resolve(ticket, Err(PLAY_REJECTED_FALLBACK.to_string()))
            }
            PlayGate::Start(ticket) => {
                if self.playhead.start() {
                    if let Some(sink) = self.sink.as_ref() {
                        sink.play();
                    }
                }
                self.resolve(ticket, Ok(()));
            }
        }
    }

    fn pause(&mut self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if self.playhead.pause() {
            sink.pause();
        }
    }

    fn seek(&mut self, to: Duration) {
        let Some(media) = self.media.as_ref() else {
            return;
        };
        // Scrubbing: rebuild the current sink and skip into the source.
        match create_sink_at(self.stream, media, to, self.volume) {
            Ok((new_sink, _)) => {
                if let Some(old) = self.sink.replace(new_sink) {
                    old.stop();
                }
            }
            Err(e) => {
                self.emit(DeviceEventKind::Fault {
                    message: Some(e.to_string()),
                });
                return;
            }
        }
        if !self.playhead.is_paused() {
            if let Some(sink) = self.sink.as_ref() {
                sink.play();
            }
        }
        self.playhead.seek(to);
        self.emit(DeviceEventKind::TimeUpdate {
            position: to.as_secs_f64(),
        });
    }

    fn tick(&mut self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let drained = sink.empty();
        if let Some(kind) = self.playhead.tick(drained) {
            self.emit(kind);
        }
    }

    fn shutdown(&mut self, fade_out_ms: u64) {
        if let Some(sink) = self.sink.take() {
            if !self.playhead.is_paused() {
                fade_out_sink(&sink, fade_out_ms);
            }
            sink.stop();
        }
    }

    fn resolve(&self, ticket: PlayTicket, result: Result<(), String>) {
        self.emit(DeviceEventKind::PlayResolved { ticket, result });
    }

    fn emit(&self, kind: DeviceEventKind) {
        let event = DeviceEvent::new(self.current.unwrap_or_default(), kind);
        // The receiver only goes away while the app is shutting down.
        let _ = self.events.send(event);
    }
}
