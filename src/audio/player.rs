use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Settings;

use super::device::OutputDevice;
use super::error::DeviceError;
use super::fetch::FetchConfig;
use super::thread::{WorkerConfig, WorkerMsg, spawn_audio_thread};
use super::types::{DeviceCommand, DeviceEvent};

/// The real output device: a handle to the rodio worker thread.
pub struct RodioDevice {
    tx: Sender<WorkerMsg>,
    join: Option<JoinHandle<()>>,
}

impl RodioDevice {
    /// Open the default output and start the worker. Device events arrive on
    /// the returned receiver and must be handed to the engine.
    pub fn open(settings: &Settings) -> Result<(Self, Receiver<DeviceEvent>), DeviceError> {
        let (tx, rx) = mpsc::channel::<WorkerMsg>();
        let (events_tx, events_rx) = mpsc::channel::<DeviceEvent>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let config = WorkerConfig {
            tick: Duration::from_millis(settings.audio.tick_ms),
            fetch: FetchConfig::from(&settings.stream),
        };
        let join = spawn_audio_thread(rx, tx.clone(), events_tx, config, ready_tx);

        ready_rx.recv().map_err(|_| DeviceError::WorkerGone)??;
        tracing::info!("audio output opened");
        Ok((
            Self {
                tx,
                join: Some(join),
            },
            events_rx,
        ))
    }

    /// Fade out whatever is playing and wait for the worker to exit.
    pub fn quit_softly(&mut self, fade_out: Duration) {
        let Some(handle) = self.join.take() else {
            return;
        };
        let _ = self.tx.send(WorkerMsg::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });
        let _ = handle.join();
    }
}

impl OutputDevice for RodioDevice {
    fn submit(&mut self, command: DeviceCommand) {
        if self.tx.send(WorkerMsg::Command(command)).is_err() {
            tracing::warn!("audio worker is gone; dropping command");
        }
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        self.quit_softly(Duration::ZERO);
    }
}
