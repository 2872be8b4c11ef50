use super::types::DeviceCommand;

/// An audio output primitive driven by the playback engine.
///
/// Commands never block and never fail synchronously; outcomes (metadata,
/// progress, faults, play results) come back as [`super::DeviceEvent`]s.
pub trait OutputDevice {
    fn submit(&mut self, command: DeviceCommand);
}

impl<D: OutputDevice + ?Sized> OutputDevice for Box<D> {
    fn submit(&mut self, command: DeviceCommand) {
        (**self).submit(command);
    }
}
