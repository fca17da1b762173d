// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    any::Any,
    borrow::Cow,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::TimeStamp;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("rejected: {msg}")]
    Rejected { msg: Cow<'static, str> },
    #[error("panicked: {msg}")]
    Panicked { msg: Cow<'static, str> },
}

impl ListenerError {
    #[must_use]
    pub fn rejected(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Rejected { msg: msg.into() }
    }

    fn panicked(payload: &(dyn Any + Send)) -> Self {
        let msg = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            Cow::Borrowed(*msg)
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            Cow::Owned(msg.clone())
        } else {
            Cow::Borrowed("unknown panic payload")
        };
        Self::Panicked { msg }
    }
}

pub type ListenerResult = std::result::Result<(), ListenerError>;

/// In-process observer of all routed messages.
///
/// Invoked concurrently from the callback threads of all enabled
/// inputs and must not block.
pub trait MidiListener: Send + Sync {
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]) -> ListenerResult;
}

impl<F> MidiListener for F
where
    F: Fn(TimeStamp, &[u8]) -> ListenerResult + Send + Sync,
{
    fn on_midi_message(&self, ts: TimeStamp, input: &[u8]) -> ListenerResult {
        self(ts, input)
    }
}

type ListenerList = Vec<Arc<dyn MidiListener>>;

/// Ordered, copy-on-write collection of listeners.
///
/// Each notification iterates over a consistent snapshot. Listeners
/// that are added or removed concurrently are only considered by
/// subsequent notifications.
pub struct ListenerRegistry {
    listeners: ArcSwap<ListenerList>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Append a listener.
    ///
    /// Registering the same listener multiple times results in
    /// multiple notifications per message.
    pub fn add(&self, listener: Arc<dyn MidiListener>) {
        self.listeners.rcu(|listeners| {
            let mut next = ListenerList::clone(listeners);
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Remove the first registration of a listener.
    ///
    /// Listeners are identified by the address of the shared instance.
    ///
    /// Returns `true` if the listener has been found and removed.
    pub fn remove<L>(&self, listener: &Arc<L>) -> bool
    where
        L: ?Sized,
    {
        let mut removed = false;
        self.listeners.rcu(|listeners| {
            let mut next = ListenerList::clone(listeners);
            removed = if let Some(pos) = next.iter().position(|registered| {
                std::ptr::addr_eq(Arc::as_ptr(registered), Arc::as_ptr(listener))
            }) {
                next.remove(pos);
                true
            } else {
                false
            };
            next
        });
        removed
    }

    /// Notify all listeners in registration order.
    ///
    /// Each failure is reported separately and does not prevent
    /// the notification of the remaining listeners.
    ///
    /// Returns the number of listeners that have been notified successfully.
    pub fn notify_all(
        &self,
        ts: TimeStamp,
        input: &[u8],
        mut on_failure: impl FnMut(usize, ListenerError),
    ) -> usize {
        let listeners = self.listeners.load();
        let mut notified = 0;
        for (index, listener) in listeners.iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_midi_message(ts, input)))
                .unwrap_or_else(|payload| Err(ListenerError::panicked(payload.as_ref())));
            match result {
                Ok(()) => notified += 1,
                Err(err) => {
                    log::warn!("MIDI listener #{index} failed: {err}");
                    on_failure(index, err);
                }
            }
        }
        notified
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
