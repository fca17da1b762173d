// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    slot::{validate_index, InputSlot, LockedInputSlot, OutputSlot},
    BoxedInputDevice, BoxedOutputDevice, BroadcastSink, DeviceDescriptor, DeviceError,
    Direction, Gate, InputDevice, ListenerRegistry, MidiListener,
};


/// Failed operation on a single device.
#[derive(Debug, Error)]
#[error("{direction} #{index}: {error}")]
pub struct DeviceFailure {
    pub direction: Direction,
    pub index: usize,
    pub error: DeviceError,
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid {direction} index {index} (number of devices: {len})")]
    InvalidIndex {
        direction: Direction,
        index: usize,
        len: usize,
    },
    #[error("failed to rewire {} transmitter(s) of input #{index}", .failures.len())]
    Rewire {
        index: usize,
        /// Transmitter index and error
        failures: Vec<(usize, DeviceError)>,
    },
    #[error("{} device operation(s) failed", .failures.len())]
    Devices { failures: Vec<DeviceFailure> },
}

pub type HubResult<T> = std::result::Result<T, HubError>;

/// Attach the gate to all transmitters of the device.
///
/// Continues after a failure. Returns the failures indexed by transmitter.
fn attach_gate(device: &dyn InputDevice, gate: &Gate) -> Vec<(usize, DeviceError)> {
    let mut failures = Vec::new();
    for (index, transmitter) in device.transmitters().iter().enumerate() {
        if let Err(err) = transmitter.attach_gate(gate.clone()) {
            log::warn!(
                "Failed to attach {state} gate to transmitter #{index} of \"{descriptor}\": {err}",
                state = gate.state(),
                descriptor = device.descriptor(),
            );
            failures.push((index, err));
        }
    }
    failures
}

/// Routes the messages of all enabled inputs to all enabled outputs
/// and all registered listeners.
///
/// Inputs and outputs are addressed by their index in the device lists
/// that have been provided on construction. All devices are initially
/// disabled.
///
/// The status of an input always reflects the wiring of its transmitters:
/// While enabled all transmitters are wired to the shared [`BroadcastSink`],
/// otherwise they are blocked.
pub struct MidiHub {
    inputs: Box<[InputSlot]>,
    broadcast_sink: Arc<BroadcastSink>,
    listeners: Arc<ListenerRegistry>,
}

impl MidiHub {
    #[must_use]
    pub fn new(
        inputs: impl IntoIterator<Item = BoxedInputDevice>,
        outputs: impl IntoIterator<Item = BoxedOutputDevice>,
    ) -> Self {
        let listeners = Arc::new(ListenerRegistry::new());
        let (inputs, broadcast_sink) = build_slots(inputs, outputs, &listeners);
        Self {
            inputs,
            broadcast_sink,
            listeners,
        }
    }

    /// Route between all MIDI ports that are currently available.
    #[cfg(feature = "midir")]
    pub fn with_available_devices() -> crate::DeviceResult<Self> {
        let device_manager = crate::midir::MidirDeviceManager::new()?;
        let inputs = device_manager.input_devices();
        let outputs = device_manager.output_devices();
        log::info!(
            "Found {num_inputs} MIDI input(s) and {num_outputs} MIDI output(s)",
            num_inputs = inputs.len(),
            num_outputs = outputs.len(),
        );
        Ok(Self::new(
            inputs
                .into_iter()
                .map(|device| Box::new(device) as BoxedInputDevice),
            outputs
                .into_iter()
                .map(|device| Box::new(device) as BoxedOutputDevice),
        ))
    }

    /// Replace all devices.
    ///
    /// The transmitters of the replaced inputs are blocked before they
    /// are dropped. The replaced devices are neither closed nor are the
    /// new devices opened. Registered listeners are kept.
    pub fn set_devices(
        &mut self,
        inputs: impl IntoIterator<Item = BoxedInputDevice>,
        outputs: impl IntoIterator<Item = BoxedOutputDevice>,
    ) {
        for (index, input) in self.inputs.iter().enumerate() {
            let mut input = input.lock();
            let failures = attach_gate(input.device(), &Gate::Blocked);
            if !failures.is_empty() {
                log::warn!(
                    "Replaced input #{index} might still be wired: {num_failures} transmitter(s) \
                     could not be blocked",
                    num_failures = failures.len()
                );
            }
            input.set_enabled(false);
        }
        let (inputs, broadcast_sink) = build_slots(inputs, outputs, &self.listeners);
        log::debug!(
            "Replaced devices: {num_inputs} input(s), {num_outputs} output(s)",
            num_inputs = inputs.len(),
            num_outputs = broadcast_sink.num_outputs(),
        );
        self.inputs = inputs;
        self.broadcast_sink = broadcast_sink;
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.broadcast_sink.num_outputs()
    }

    #[must_use]
    pub fn input_descriptor(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.inputs.get(index).map(InputSlot::descriptor)
    }

    #[must_use]
    pub fn output_descriptor(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.broadcast_sink.output_descriptor(index)
    }

    /// The sink that is attached to the transmitters of all enabled inputs.
    #[must_use]
    pub const fn broadcast_sink(&self) -> &Arc<BroadcastSink> {
        &self.broadcast_sink
    }

    pub fn is_input_enabled(&self, index: usize) -> HubResult<bool> {
        let index = validate_index(Direction::Input, index, self.inputs.len())?;
        Ok(self.inputs[index].is_enabled())
    }

    pub fn is_output_enabled(&self, index: usize) -> HubResult<bool> {
        let outputs = self.broadcast_sink.outputs();
        let index = validate_index(Direction::Output, index, outputs.len())?;
        Ok(outputs[index].is_enabled())
    }

    /// Open all devices.
    ///
    /// Each opened input is blocked and disabled. Failures are collected
    /// and do not prevent the remaining devices from being opened.
    pub fn open_all(&self) -> HubResult<()> {
        let mut failures = Vec::new();
        log::debug!("Opening inputs");
        for (index, input) in self.inputs.iter().enumerate() {
            let mut input = input.lock();
            if let Err(error) = input.device().open() {
                log::warn!(
                    "Failed to open input #{index} \"{descriptor}\": {error}",
                    descriptor = input.device().descriptor(),
                );
                failures.push(DeviceFailure {
                    direction: Direction::Input,
                    index,
                    error,
                });
                continue;
            }
            let gate_failures = attach_gate(input.device(), &Gate::Blocked);
            if gate_failures.is_empty() {
                input.set_enabled(false);
                log::debug!("Input #{index} is open");
            }
            failures.extend(
                gate_failures
                    .into_iter()
                    .map(|(_, error)| DeviceFailure {
                        direction: Direction::Input,
                        index,
                        error,
                    }),
            );
        }
        log::debug!("Opening outputs");
        for (index, output) in self.broadcast_sink.outputs().iter().enumerate() {
            if let Err(error) = output.open() {
                log::warn!(
                    "Failed to open output #{index} \"{descriptor}\": {error}",
                    descriptor = output.descriptor(),
                );
                failures.push(DeviceFailure {
                    direction: Direction::Output,
                    index,
                    error,
                });
                continue;
            }
            log::debug!("Output #{index} is open");
        }
        self.finish_lifecycle("Opened", failures)
    }

    /// Close all devices, regardless of their status.
    ///
    /// Failures are collected and do not prevent the remaining devices
    /// from being closed.
    pub fn close_all(&self) -> HubResult<()> {
        let mut failures = Vec::new();
        log::debug!("Closing inputs");
        for (index, input) in self.inputs.iter().enumerate() {
            let mut input = input.lock();
            if let Err(error) = input.device().close() {
                log::warn!(
                    "Failed to close input #{index} \"{descriptor}\": {error}",
                    descriptor = input.device().descriptor(),
                );
                failures.push(DeviceFailure {
                    direction: Direction::Input,
                    index,
                    error,
                });
                continue;
            }
            log::debug!("Input #{index} closed");
        }
        log::debug!("Closing outputs");
        for (index, output) in self.broadcast_sink.outputs().iter().enumerate() {
            if let Err(error) = output.close() {
                log::warn!(
                    "Failed to close output #{index} \"{descriptor}\": {error}",
                    descriptor = output.descriptor(),
                );
                failures.push(DeviceFailure {
                    direction: Direction::Output,
                    index,
                    error,
                });
                continue;
            }
            log::debug!("Output #{index} closed");
        }
        self.finish_lifecycle("Closed", failures)
    }

    fn finish_lifecycle(&self, action: &str, failures: Vec<DeviceFailure>) -> HubResult<()> {
        let num_devices = self.num_inputs() + self.num_outputs();
        if failures.is_empty() {
            log::info!("{action} all {num_devices} device(s)");
            return Ok(());
        }
        log::info!(
            "{action} {num_devices} device(s) with {num_failures} failure(s)",
            num_failures = failures.len()
        );
        Err(HubError::Devices { failures })
    }

    /// Enable or disable the routing of messages from an input.
    ///
    /// All transmitters of the input are rewired, even if the status
    /// does not change.
    ///
    /// If a transmitter could not be rewired all other transmitters are
    /// rewired back to their previous gate and the status is unchanged.
    /// Only if this rollback fails as well the input is considered enabled,
    /// i.e. the status remains `true` as long as messages might still be
    /// routed.
    pub fn set_input_enabled(&self, index: usize, enabled: bool) -> HubResult<()> {
        let index = validate_index(Direction::Input, index, self.inputs.len())?;
        let mut input = self.inputs[index].lock();
        let was_enabled = input.is_enabled();
        self.rewire_input(index, &mut input, was_enabled, enabled)?;
        match (was_enabled, enabled) {
            (false, true) => log::debug!("Input #{index} enabled"),
            (true, false) => log::debug!("Input #{index} disabled"),
            _ => (),
        }
        Ok(())
    }

    fn gate(&self, enabled: bool) -> Gate {
        if enabled {
            Gate::Broadcasting(Arc::clone(&self.broadcast_sink))
        } else {
            Gate::Blocked
        }
    }

    fn rewire_input(
        &self,
        index: usize,
        input: &mut LockedInputSlot<'_>,
        was_enabled: bool,
        enabled: bool,
    ) -> HubResult<()> {
        let failures = attach_gate(input.device(), &self.gate(enabled));
        if failures.is_empty() {
            input.set_enabled(enabled);
            return Ok(());
        }
        // Transmitters that failed to attach the new gate keep their previous gate.
        let mut rollback_failed = false;
        if enabled != was_enabled {
            let previous_gate = self.gate(was_enabled);
            let device = input.device();
            for (transmitter_index, transmitter) in device.transmitters().iter().enumerate() {
                if failures.iter().any(|(failed, _)| *failed == transmitter_index) {
                    continue;
                }
                if let Err(err) = transmitter.attach_gate(previous_gate.clone()) {
                    log::warn!(
                        "Failed to restore {state} gate of transmitter #{transmitter_index} of \
                         \"{descriptor}\": {err}",
                        state = previous_gate.state(),
                        descriptor = device.descriptor(),
                    );
                    rollback_failed = true;
                }
            }
        }
        let may_route = was_enabled || (enabled && rollback_failed);
        if may_route != was_enabled {
            log::warn!("Input #{index} might still route messages");
        }
        input.set_enabled(may_route);
        Err(HubError::Rewire { index, failures })
    }

    /// Enable or disable the delivery of messages to an output.
    pub fn set_output_enabled(&self, index: usize, enabled: bool) -> HubResult<()> {
        let outputs = self.broadcast_sink.outputs();
        let index = validate_index(Direction::Output, index, outputs.len())?;
        let was_enabled = outputs[index].set_enabled(enabled);
        match (was_enabled, enabled) {
            (false, true) => log::debug!("Output #{index} enabled"),
            (true, false) => log::debug!("Output #{index} disabled"),
            _ => (),
        }
        Ok(())
    }

    /// Register a listener for all routed messages.
    ///
    /// Listeners are not deduplicated.
    pub fn add_listener(&self, listener: Arc<dyn MidiListener>) {
        self.listeners.add(listener);
    }

    /// Unregister the first registration of a listener.
    pub fn remove_listener<L>(&self, listener: &Arc<L>) -> bool
    where
        L: ?Sized,
    {
        self.listeners.remove(listener)
    }

    #[must_use]
    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for MidiHub {
    fn default() -> Self {
        Self::new(
            Vec::<BoxedInputDevice>::new(),
            Vec::<BoxedOutputDevice>::new(),
        )
    }
}

impl fmt::Debug for MidiHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiHub")
            .field("num_inputs", &self.inputs.len())
            .field("broadcast_sink", &self.broadcast_sink)
            .finish()
    }
}

fn build_slots(
    inputs: impl IntoIterator<Item = BoxedInputDevice>,
    outputs: impl IntoIterator<Item = BoxedOutputDevice>,
    listeners: &Arc<ListenerRegistry>,
) -> (Box<[InputSlot]>, Arc<BroadcastSink>) {
    let inputs = inputs.into_iter().map(InputSlot::new).collect();
    let outputs = outputs.into_iter().map(OutputSlot::new).collect();
    let broadcast_sink = Arc::new(BroadcastSink::new(outputs, Arc::clone(listeners)));
    (inputs, broadcast_sink)
}
