// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use std::{fmt, ops::Deref, sync::Arc};

use arc_swap::ArcSwap;

use crate::{BroadcastSink, DeviceResult, TimeStamp, Transmitter};


/// Receives the messages of a transmitter.
pub trait MidiSink: Send + Sync {
    /// Invoked for each incoming message.
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]);
}

impl<D> MidiSink for D
where
    D: Deref + Send + Sync,
    <D as Deref>::Target: MidiSink,
{
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]) {
        self.deref().on_midi_message(ts, input);
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingSink;

impl MidiSink for BlockingSink {
    fn on_midi_message(&self, _ts: TimeStamp, _input: &[u8]) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum GateState {
    Blocked,
    Broadcasting,
}

/// The sink that is attached to a transmitter.
///
/// Either discards all messages or forwards them to the single,
/// shared [`BroadcastSink`].
#[derive(Clone, Default)]
pub enum Gate {
    #[default]
    Blocked,
    Broadcasting(Arc<BroadcastSink>),
}

impl Gate {
    #[must_use]
    pub const fn state(&self) -> GateState {
        match self {
            Self::Blocked => GateState::Blocked,
            Self::Broadcasting(_) => GateState::Broadcasting,
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Gate").field(&self.state()).finish()
    }
}

impl MidiSink for Gate {
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]) {
        match self {
            Self::Blocked => BlockingSink.on_midi_message(ts, input),
            Self::Broadcasting(sink) => sink.on_midi_message(ts, input),
        }
    }
}

/// Transmitter with an atomically swappable [`Gate`].
///
/// Device layers without a native sink concept feed their incoming
/// messages into [`GateTransmitter::transmit()`] from the platform
/// callback thread.
pub struct GateTransmitter {
    gate: ArcSwap<Gate>,
}

impl GateTransmitter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: ArcSwap::from_pointee(Gate::Blocked),
        }
    }

    #[must_use]
    pub fn gate_state(&self) -> GateState {
        self.gate.load().state()
    }

    /// Deliver an incoming message to the currently attached gate.
    pub fn transmit(&self, ts: TimeStamp, input: &[u8]) {
        log::trace!("Transmitting MIDI input: {ts} {input:0x?}");
        self.gate.load().on_midi_message(ts, input);
    }
}

impl Default for GateTransmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GateTransmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateTransmitter")
            .field("gate", &self.gate_state())
            .finish()
    }
}

impl Transmitter for GateTransmitter {
    fn attach_gate(&self, gate: Gate) -> DeviceResult<()> {
        self.gate.store(Arc::new(gate));
        Ok(())
    }
}
