// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

//! In-memory device layer for testing.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;

use super::{
    BoxedInputDevice, BoxedOutputDevice, DeviceDescriptor, DeviceError, DeviceResult,
    InputDevice, OutputDevice, Transmitter,
};
use crate::{
    Gate, GateState, GateTransmitter, ListenerError, ListenerResult, MidiListener, TimeStamp,
};

pub(crate) type Messages = Vec<(TimeStamp, Vec<u8>)>;

#[derive(Debug, Default)]
pub(crate) struct MockDeviceState {
    pub(crate) open: AtomicBool,
    pub(crate) fail_open: AtomicBool,
    pub(crate) fail_close: AtomicBool,
}

impl MockDeviceState {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn open(&self) -> DeviceResult<()> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(DeviceError::Other {
                msg: "open rejected".into(),
            });
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> DeviceResult<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(DeviceError::Other {
                msg: "close rejected".into(),
            });
        }
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockTransmitter {
    inner: GateTransmitter,
    pub(crate) fail_attach: AtomicBool,
}

impl MockTransmitter {
    pub(crate) fn gate_state(&self) -> GateState {
        self.inner.gate_state()
    }

    /// Simulate an incoming message on this transmitter only.
    pub(crate) fn receive(&self, ts: TimeStamp, input: &[u8]) {
        self.inner.transmit(ts, input);
    }
}

impl Transmitter for MockTransmitter {
    fn attach_gate(&self, gate: Gate) -> DeviceResult<()> {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(DeviceError::Other {
                msg: "attach rejected".into(),
            });
        }
        self.inner.attach_gate(gate)
    }
}

/// Test handle of a [`MockInputDevice`] that has been moved into the hub.
#[derive(Debug, Clone)]
pub(crate) struct MockInput {
    pub(crate) state: Arc<MockDeviceState>,
    pub(crate) transmitters: Vec<Arc<MockTransmitter>>,
}

impl MockInput {
    /// Simulate an incoming message on all transmitters.
    pub(crate) fn receive(&self, ts: TimeStamp, input: &[u8]) {
        for transmitter in &self.transmitters {
            transmitter.receive(ts, input);
        }
    }

    pub(crate) fn gate_states(&self) -> Vec<GateState> {
        self.transmitters
            .iter()
            .map(|transmitter| transmitter.gate_state())
            .collect()
    }
}

struct MockInputDevice {
    descriptor: DeviceDescriptor,
    state: Arc<MockDeviceState>,
    transmitters: Vec<Arc<dyn Transmitter>>,
}

impl InputDevice for MockInputDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn open(&mut self) -> DeviceResult<()> {
        self.state.open()
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.state.close()
    }

    fn transmitters(&self) -> &[Arc<dyn Transmitter>] {
        &self.transmitters
    }
}

pub(crate) fn new_input(
    name: &'static str,
    num_transmitters: usize,
) -> (BoxedInputDevice, MockInput) {
    let state = Arc::new(MockDeviceState::default());
    let transmitters = (0..num_transmitters)
        .map(|_| Arc::new(MockTransmitter::default()))
        .collect::<Vec<_>>();
    let device = MockInputDevice {
        descriptor: DeviceDescriptor::new(name),
        state: Arc::clone(&state),
        transmitters: transmitters
            .iter()
            .map(|transmitter| Arc::clone(transmitter) as Arc<dyn Transmitter>)
            .collect(),
    };
    let handle = MockInput {
        state,
        transmitters,
    };
    (Box::new(device), handle)
}

/// Test handle of a [`MockOutputDevice`] that has been moved into the hub.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockOutput {
    pub(crate) state: Arc<MockDeviceState>,
    pub(crate) fail_send: Arc<AtomicBool>,
    sent: Arc<Mutex<Messages>>,
}

impl MockOutput {
    pub(crate) fn sent(&self) -> Messages {
        self.sent.lock().clone()
    }
}

struct MockOutputDevice {
    descriptor: DeviceDescriptor,
    handle: MockOutput,
}

impl OutputDevice for MockOutputDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn open(&mut self) -> DeviceResult<()> {
        self.handle.state.open()
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.handle.state.close()
    }

    fn send_midi_output(&mut self, ts: TimeStamp, output: &[u8]) -> DeviceResult<()> {
        if self.handle.fail_send.load(Ordering::SeqCst) {
            return Err(DeviceError::Send {
                msg: "send rejected".into(),
            });
        }
        self.handle.sent.lock().push((ts, output.to_vec()));
        Ok(())
    }
}

pub(crate) fn new_output(name: &'static str) -> (BoxedOutputDevice, MockOutput) {
    let handle = MockOutput::default();
    let device = MockOutputDevice {
        descriptor: DeviceDescriptor::new(name),
        handle: handle.clone(),
    };
    (Box::new(device), handle)
}

/// Records all notifications.
#[derive(Debug, Default)]
pub(crate) struct RecordingListener {
    received: Mutex<Messages>,
}

impl RecordingListener {
    pub(crate) fn received(&self) -> Messages {
        self.received.lock().clone()
    }
}

impl MidiListener for RecordingListener {
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]) -> ListenerResult {
        self.received.lock().push((ts, input.to_vec()));
        Ok(())
    }
}

/// Rejects all notifications.
#[derive(Debug, Default)]
pub(crate) struct RejectingListener;

impl MidiListener for RejectingListener {
    fn on_midi_message(&self, _ts: TimeStamp, _input: &[u8]) -> ListenerResult {
        Err(ListenerError::rejected("not interested"))
    }
}
