// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

//! Device layer driven by [`midir`](::midir).

use std::sync::Arc;

use ::midir::{
    ConnectError, Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput,
    MidiOutputConnection, MidiOutputPort, PortInfoError, SendError,
};

use crate::{
    DeviceDescriptor, DeviceError, DeviceResult, Direction, GateTransmitter, InputDevice,
    OutputDevice, TimeStamp, Transmitter,
};

#[cfg(test)]
mod tests;

impl From<SendError> for DeviceError {
    fn from(err: SendError) -> Self {
        DeviceError::Send {
            msg: err.to_string().into(),
        }
    }
}

// The unconnected client is dropped, only the reason is kept.
impl<T> From<ConnectError<T>> for DeviceError {
    fn from(err: ConnectError<T>) -> Self {
        DeviceError::Connect {
            msg: err.to_string().into(),
        }
    }
}

// Adapter for the midir callback closure
fn handle_input(micros: u64, input: &[u8], transmitter: &mut Arc<GateTransmitter>) {
    let ts = TimeStamp::from_micros(micros);
    transmitter.transmit(ts, input);
}

/// MIDI input port driven by [`midir`](::midir).
///
/// Exposes a single transmitter that keeps its gate while the port
/// is closed and reopened.
#[allow(missing_debug_implementations)]
pub struct MidirInputDevice {
    descriptor: DeviceDescriptor,
    port: MidiInputPort,
    transmitter: Arc<GateTransmitter>,
    transmitters: [Arc<dyn Transmitter>; 1],
    connection: Option<MidiInputConnection<Arc<GateTransmitter>>>,
}

impl MidirInputDevice {
    #[must_use]
    pub fn new(descriptor: DeviceDescriptor, port: MidiInputPort) -> Self {
        let transmitter = Arc::new(GateTransmitter::new());
        let transmitters = [Arc::clone(&transmitter) as Arc<dyn Transmitter>];
        Self {
            descriptor,
            port,
            transmitter,
            transmitters,
            connection: None,
        }
    }

    #[must_use]
    pub fn port(&self) -> &MidiInputPort {
        &self.port
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}

impl InputDevice for MidirInputDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn open(&mut self) -> DeviceResult<()> {
        if self.is_open() {
            log::debug!("MIDI input \"{}\" is already open", self.descriptor);
            return Ok(());
        }
        let port_name = &self.descriptor.name;
        let mut input = MidiInput::new(port_name)?;
        input.ignore(Ignore::None);
        let connection = input.connect(
            &self.port,
            port_name,
            handle_input,
            Arc::clone(&self.transmitter),
        )?;
        self.connection = Some(connection);
        debug_assert!(self.is_open());
        Ok(())
    }

    fn close(&mut self) -> DeviceResult<()> {
        let Some(connection) = self.connection.take() else {
            log::debug!("MIDI input \"{}\" is not open", self.descriptor);
            return Ok(());
        };
        connection.close();
        debug_assert!(!self.is_open());
        Ok(())
    }

    fn transmitters(&self) -> &[Arc<dyn Transmitter>] {
        &self.transmitters
    }
}

/// MIDI output port driven by [`midir`](::midir).
#[allow(missing_debug_implementations)]
pub struct MidirOutputDevice {
    descriptor: DeviceDescriptor,
    port: MidiOutputPort,
    connection: Option<MidiOutputConnection>,
}

impl MidirOutputDevice {
    #[must_use]
    pub const fn new(descriptor: DeviceDescriptor, port: MidiOutputPort) -> Self {
        Self {
            descriptor,
            port,
            connection: None,
        }
    }

    #[must_use]
    pub fn port(&self) -> &MidiOutputPort {
        &self.port
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}

impl OutputDevice for MidirOutputDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn open(&mut self) -> DeviceResult<()> {
        if self.is_open() {
            log::debug!("MIDI output \"{}\" is already open", self.descriptor);
            return Ok(());
        }
        let port_name = &self.descriptor.name;
        let output = MidiOutput::new(port_name)?;
        let connection = output.connect(&self.port, port_name)?;
        self.connection = Some(connection);
        Ok(())
    }

    fn close(&mut self) -> DeviceResult<()> {
        let Some(connection) = self.connection.take() else {
            log::debug!("MIDI output \"{}\" is not open", self.descriptor);
            return Ok(());
        };
        connection.close();
        Ok(())
    }

    fn send_midi_output(&mut self, _ts: TimeStamp, output: &[u8]) -> DeviceResult<()> {
        let Some(connection) = &mut self.connection else {
            return Err(DeviceError::Disconnected);
        };
        connection.send(output).map_err(Into::into)
    }
}

/// Lists the available [`midir`](::midir) ports.
#[allow(missing_debug_implementations)]
pub struct MidirDeviceManager {
    input: MidiInput,
    output: MidiOutput,
}

impl MidirDeviceManager {
    pub fn new() -> DeviceResult<Self> {
        let mut input = MidiInput::new("midihub input port watcher")?;
        input.ignore(Ignore::None);
        let output = MidiOutput::new("midihub output port watcher")?;
        Ok(MidirDeviceManager { input, output })
    }

    /// All available input ports.
    #[must_use]
    pub fn input_devices(&self) -> Vec<MidirInputDevice> {
        self.input_devices_by_name(|_| true)
    }

    /// All available output ports.
    #[must_use]
    pub fn output_devices(&self) -> Vec<MidirOutputDevice> {
        self.output_devices_by_name(|_| true)
    }

    /// Available input ports with a matching name.
    ///
    /// Ports with an unreadable name are skipped.
    pub fn input_devices_by_name(
        &self,
        filter_port_name: impl FnMut(&str) -> bool,
    ) -> Vec<MidirInputDevice> {
        filter_ports_by_name(
            Direction::Input,
            self.input.ports(),
            |port| self.input.port_name(port),
            filter_port_name,
        )
        .map(|(port_name, port)| MidirInputDevice::new(DeviceDescriptor::new(port_name), port))
        .collect()
    }

    /// Available output ports with a matching name.
    ///
    /// Ports with an unreadable name are skipped.
    pub fn output_devices_by_name(
        &self,
        filter_port_name: impl FnMut(&str) -> bool,
    ) -> Vec<MidirOutputDevice> {
        filter_ports_by_name(
            Direction::Output,
            self.output.ports(),
            |port| self.output.port_name(port),
            filter_port_name,
        )
        .map(|(port_name, port)| MidirOutputDevice::new(DeviceDescriptor::new(port_name), port))
        .collect()
    }
}

// Ports might disappear while they are listed.
fn filter_ports_by_name<P>(
    direction: Direction,
    ports: impl IntoIterator<Item = P>,
    mut port_name: impl FnMut(&P) -> Result<String, PortInfoError>,
    mut filter_port_name: impl FnMut(&str) -> bool,
) -> impl Iterator<Item = (String, P)> {
    ports.into_iter().filter_map(move |port| {
        let port_name = match port_name(&port) {
            Ok(port_name) => port_name,
            Err(err) => {
                log::warn!("Skipping MIDI {direction} port without name: {err}");
                return None;
            }
        };
        if !filter_port_name(&port_name) {
            log::debug!("Skipping MIDI {direction} port \"{port_name}\"");
            return None;
        }
        log::debug!("Found MIDI {direction} port \"{port_name}\"");
        Some((port_name, port))
    })
}
