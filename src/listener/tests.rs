// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use super::*;
use crate::device::mock::{RecordingListener, RejectingListener};

const TS: TimeStamp = TimeStamp::from_micros(42);

const NOTE_ON: &[u8] = &[0x90, 64, 90];

#[test]
fn notify_in_registration_order() {
    let registry = ListenerRegistry::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for id in 0..3 {
        let order = Arc::clone(&order);
        registry.add(Arc::new(move |_ts: TimeStamp, _input: &[u8]| -> ListenerResult {
            order.lock().push(id);
            Ok(())
        }));
    }
    assert_eq!(3, registry.notify_all(TS, NOTE_ON, |_, _| unreachable!()));
    assert_eq!(vec![0, 1, 2], *order.lock());
}

#[test]
fn duplicate_registrations_are_notified_twice() {
    let registry = ListenerRegistry::new();
    let listener = Arc::new(RecordingListener::default());
    registry.add(Arc::clone(&listener) as _);
    registry.add(Arc::clone(&listener) as _);
    assert_eq!(2, registry.len());
    assert_eq!(2, registry.notify_all(TS, NOTE_ON, |_, _| unreachable!()));
    assert_eq!(2, listener.received().len());
}

#[test]
fn remove_first_registration_only() {
    let registry = ListenerRegistry::new();
    let listener = Arc::new(RecordingListener::default());
    let other = Arc::new(RecordingListener::default());
    registry.add(Arc::clone(&listener) as _);
    registry.add(Arc::clone(&other) as _);
    registry.add(Arc::clone(&listener) as _);
    assert!(registry.remove(&listener));
    assert_eq!(2, registry.len());
    assert!(registry.remove(&listener));
    assert!(!registry.remove(&listener));
    assert_eq!(1, registry.len());
    registry.notify_all(TS, NOTE_ON, |_, _| unreachable!());
    assert!(listener.received().is_empty());
    assert_eq!(1, other.received().len());
}

#[test]
fn remove_unknown_listener() {
    let registry = ListenerRegistry::new();
    assert!(registry.is_empty());
    assert!(!registry.remove(&Arc::new(RecordingListener::default())));
}

#[test]
fn rejecting_listener_does_not_prevent_delivery_to_others() {
    let registry = ListenerRegistry::new();
    let listener = Arc::new(RecordingListener::default());
    registry.add(Arc::new(RejectingListener));
    registry.add(Arc::clone(&listener) as _);
    let mut failures = Vec::new();
    let notified = registry.notify_all(TS, NOTE_ON, |index, err| failures.push((index, err)));
    assert_eq!(1, notified);
    assert_eq!(1, failures.len());
    assert_eq!(0, failures[0].0);
    assert!(matches!(failures[0].1, ListenerError::Rejected { .. }));
    assert_eq!(vec![(TS, NOTE_ON.to_vec())], listener.received());
}

#[test]
fn panicking_listener_does_not_prevent_delivery_to_others() {
    let registry = ListenerRegistry::new();
    let listener = Arc::new(RecordingListener::default());
    registry.add(Arc::new(|_ts: TimeStamp, _input: &[u8]| -> ListenerResult {
        panic!("boom");
    }));
    registry.add(Arc::clone(&listener) as _);
    let mut failures = Vec::new();
    let notified = registry.notify_all(TS, NOTE_ON, |index, err| failures.push((index, err)));
    assert_eq!(1, notified);
    let [(0, ListenerError::Panicked { msg })] = failures.as_slice() else {
        panic!("unexpected failures: {failures:?}");
    };
    assert_eq!("boom", &**msg);
    assert_eq!(1, listener.received().len());
}
