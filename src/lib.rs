// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

mod broadcast;
pub use self::broadcast::{BroadcastReport, BroadcastSink};

mod device;
pub use self::device::{
    BoxedInputDevice, BoxedOutputDevice, DeviceDescriptor, DeviceError, DeviceResult,
    InputDevice, OutputDevice, Transmitter,
};

mod hub;
pub use self::hub::{DeviceFailure, HubError, HubResult, MidiHub};

mod listener;
pub use self::listener::{ListenerError, ListenerRegistry, ListenerResult, MidiListener};

mod sink;
pub use self::sink::{BlockingSink, Gate, GateState, GateTransmitter, MidiSink};

mod slot;

#[cfg(feature = "midir")]
pub mod midir;

/// Time stamp of a MIDI message in microseconds.
///
/// The origin is defined by the platform clock of the device layer,
/// only differences between time stamps of the same device are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, derive_more::Display)]
#[display("{micros} µs")]
pub struct TimeStamp {
    micros: u64,
}

impl TimeStamp {
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    #[must_use]
    pub const fn to_micros(self) -> u64 {
        self.micros
    }
}

/// Message flow direction of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}
