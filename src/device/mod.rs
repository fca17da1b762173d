// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

//! Contract of the platform device layer.
//!
//! Discovery and the open/close lifecycle of device handles are provided
//! by the platform MIDI API. The hub only depends on these traits.

use std::{borrow::Cow, sync::Arc};

use thiserror::Error;

use crate::{Gate, TimeStamp};

#[cfg(test)]
pub(crate) mod mock;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("disconnected")]
    Disconnected,
    #[error("connect: {msg}")]
    Connect { msg: Cow<'static, str> },
    #[error("send: {msg}")]
    Send { msg: Cow<'static, str> },
    #[error("{msg}")]
    Other { msg: Cow<'static, str> },
    #[cfg(feature = "midir")]
    #[error(transparent)]
    Init(#[from] ::midir::InitError),
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{name}")]
pub struct DeviceDescriptor {
    pub name: Cow<'static, str>,
}

impl DeviceDescriptor {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }
}

/// Message delivery channel of an input device.
///
/// Exactly one [`Gate`] is attached at any time. Attaching a gate
/// replaces the previous one.
pub trait Transmitter: Send + Sync {
    /// Replace the attached gate.
    ///
    /// The previous gate must remain attached on failure.
    fn attach_gate(&self, gate: Gate) -> DeviceResult<()>;
}

/// Source of timestamped MIDI messages.
pub trait InputDevice: Send {
    /// Must return the same descriptor during the whole lifetime.
    #[must_use]
    fn descriptor(&self) -> &DeviceDescriptor;

    fn open(&mut self) -> DeviceResult<()>;

    fn close(&mut self) -> DeviceResult<()>;

    /// All transmitters that are currently exposed by the device.
    #[must_use]
    fn transmitters(&self) -> &[Arc<dyn Transmitter>];
}

/// Sink for timestamped MIDI messages.
pub trait OutputDevice: Send {
    /// Must return the same descriptor during the whole lifetime.
    #[must_use]
    fn descriptor(&self) -> &DeviceDescriptor;

    fn open(&mut self) -> DeviceResult<()>;

    fn close(&mut self) -> DeviceResult<()>;

    /// Push a single message to the device.
    fn send_midi_output(&mut self, ts: TimeStamp, output: &[u8]) -> DeviceResult<()>;
}

pub type BoxedInputDevice = Box<dyn InputDevice + 'static>;

pub type BoxedOutputDevice = Box<dyn OutputDevice + 'static>;
