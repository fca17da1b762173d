// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use std::{fmt, sync::Arc};

use crate::{
    slot::OutputSlot, DeviceDescriptor, DeviceError, ListenerError, ListenerRegistry, MidiSink,
    TimeStamp,
};


/// Outcome of broadcasting a single message.
///
/// Failures are indexed by the position of the output or listener.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered_outputs: usize,
    pub notified_listeners: usize,
    pub output_failures: Vec<(usize, DeviceError)>,
    pub listener_failures: Vec<(usize, ListenerError)>,
}

impl BroadcastReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.output_failures.is_empty() && self.listener_failures.is_empty()
    }
}

/// Forwards each message to all enabled outputs and all listeners.
///
/// A single instance is shared by all enabled inputs. The fan-out only
/// depends on the current state of the outputs and listeners, not on the
/// input that received the message.
pub struct BroadcastSink {
    outputs: Box<[OutputSlot]>,
    listeners: Arc<ListenerRegistry>,
}

impl BroadcastSink {
    #[must_use]
    pub(crate) fn new(outputs: Box<[OutputSlot]>, listeners: Arc<ListenerRegistry>) -> Self {
        Self { outputs, listeners }
    }

    #[must_use]
    pub(crate) fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn output_descriptor(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.outputs.get(index).map(OutputSlot::descriptor)
    }

    /// Send the message to all enabled outputs in order and then
    /// notify all listeners in registration order.
    ///
    /// Each failure is logged and reported, the delivery continues
    /// with the next target.
    pub fn broadcast(&self, ts: TimeStamp, input: &[u8]) -> BroadcastReport {
        log::trace!("Broadcasting MIDI message: {ts} {input:0x?}");
        let mut report = BroadcastReport::default();
        for (index, output) in self.outputs.iter().enumerate() {
            if !output.is_enabled() {
                continue;
            }
            match output.send_midi_output(ts, input) {
                Ok(()) => {
                    report.delivered_outputs += 1;
                }
                Err(err) => {
                    log::warn!(
                        "Failed to send MIDI message to output #{index} \"{descriptor}\": {err}",
                        descriptor = output.descriptor()
                    );
                    report.output_failures.push((index, err));
                }
            }
        }
        let mut listener_failures = Vec::new();
        report.notified_listeners = self.listeners.notify_all(ts, input, |index, err| {
            listener_failures.push((index, err));
        });
        report.listener_failures = listener_failures;
        report
    }
}

impl MidiSink for BroadcastSink {
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]) {
        let report = self.broadcast(ts, input);
        if !report.is_complete() {
            log::debug!(
                "Incomplete broadcast of MIDI message {ts}: {output_failures} output \
                 failure(s), {listener_failures} listener failure(s)",
                output_failures = report.output_failures.len(),
                listener_failures = report.listener_failures.len(),
            );
        }
    }
}

impl fmt::Debug for BroadcastSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastSink")
            .field("num_outputs", &self.outputs.len())
            .field("listeners", &self.listeners)
            .finish()
    }
}
