// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

//! Device handles paired with their enabled status.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::{
    BoxedInputDevice, BoxedOutputDevice, DeviceDescriptor, DeviceResult, Direction, HubError,
    HubResult, InputDevice, TimeStamp,
};


/// Status flags are only written while holding the device lock.
const STORE_ORDERING: Ordering = Ordering::Release;

const LOAD_ORDERING: Ordering = Ordering::Acquire;

/// Ensure that `index` addresses an element of a collection with `len` elements.
pub(crate) fn validate_index(direction: Direction, index: usize, len: usize) -> HubResult<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(HubError::InvalidIndex {
            direction,
            index,
            len,
        })
    }
}

pub(crate) struct InputSlot {
    descriptor: DeviceDescriptor,
    device: Mutex<BoxedInputDevice>,
    enabled: AtomicBool,
}

impl InputSlot {
    #[must_use]
    pub(crate) fn new(device: BoxedInputDevice) -> Self {
        Self {
            descriptor: device.descriptor().clone(),
            device: Mutex::new(device),
            enabled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub(crate) const fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(LOAD_ORDERING)
    }

    /// Exclusive access for updating both the device wiring and the status.
    pub(crate) fn lock(&self) -> LockedInputSlot<'_> {
        LockedInputSlot {
            device: self.device.lock(),
            enabled: &self.enabled,
        }
    }
}

pub(crate) struct LockedInputSlot<'a> {
    device: MutexGuard<'a, BoxedInputDevice>,
    enabled: &'a AtomicBool,
}

impl LockedInputSlot<'_> {
    pub(crate) fn device(&mut self) -> &mut (dyn InputDevice + 'static) {
        &mut **self.device
    }

    #[must_use]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(LOAD_ORDERING)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, STORE_ORDERING);
    }
}

pub(crate) struct OutputSlot {
    descriptor: DeviceDescriptor,
    device: Mutex<BoxedOutputDevice>,
    enabled: AtomicBool,
}

impl OutputSlot {
    #[must_use]
    pub(crate) fn new(device: BoxedOutputDevice) -> Self {
        Self {
            descriptor: device.descriptor().clone(),
            device: Mutex::new(device),
            enabled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub(crate) const fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(LOAD_ORDERING)
    }

    /// Returns the previous status.
    pub(crate) fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    pub(crate) fn open(&self) -> DeviceResult<()> {
        self.device.lock().open()
    }

    pub(crate) fn close(&self) -> DeviceResult<()> {
        self.device.lock().close()
    }

    pub(crate) fn send_midi_output(&self, ts: TimeStamp, output: &[u8]) -> DeviceResult<()> {
        self.device.lock().send_midi_output(ts, output)
    }
}
