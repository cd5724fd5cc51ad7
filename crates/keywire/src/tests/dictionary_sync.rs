use std::{cell::RefCell, rc::Rc, time::Duration};

use serde_json::json;

use crate::{
    canonical_signature, CodecOptions, Dictionary, DictionarySnapshot, ManualScheduler,
    MessageCodec,
};

use super::record;

#[test]
fn canonical_signatures_sort_keys() {
    assert_eq!(canonical_signature(&["foo", "bar", "baz"]), "bar,baz,foo");
    assert_eq!(canonical_signature(&["a"]), "a");
}

#[test]
fn shape_ids_start_at_one_and_increment() {
    let mut dictionary = Dictionary::new();
    assert_eq!(dictionary.register_shape(&["foo"]), 1);
    assert_eq!(dictionary.register_shape(&["bar", "baz"]), 2);
    assert_eq!(dictionary.shape_keys(1), Some(&["foo".to_string()][..]));
    assert_eq!(dictionary.shape_keys(3), None);
}

#[test]
fn shapes_are_stored_sorted_and_deduplicated() {
    let mut dictionary = Dictionary::new();
    let id = dictionary.register_shape(&["foo", "bar", "foo"]);
    assert_eq!(
        dictionary.shape_keys(id),
        Some(&["bar".to_string(), "foo".to_string()][..])
    );
    assert_eq!(
        dictionary.resolve_shape_id(["bar", "foo"].into_iter()),
        Some(id)
    );
    assert_eq!(dictionary.resolve_shape_id(["bar"].into_iter()), None);
}

#[test]
fn general_key_ids_start_at_zero_and_stay_stable() {
    let mut dictionary = Dictionary::new();
    assert_eq!(dictionary.register_general_key("foo"), (0, true));
    assert_eq!(dictionary.register_general_key("bar"), (1, true));
    assert_eq!(dictionary.register_general_key("foo"), (0, false));
    assert_eq!(dictionary.general_key_id("bar"), Some(1));
    assert_eq!(dictionary.general_key_name(1), Some("bar"));
    assert_eq!(dictionary.general_key_name(2), None);
}

#[test]
fn snapshots_replace_wholesale_and_advance_counters() {
    let mut source = Dictionary::new();
    source.register_shape(&["foo", "bar"]);
    source.register_shape(&["baz"]);
    source.register_general_key("qux");

    let mut target = Dictionary::new();
    target.register_shape(&["stale"]);
    target.register_general_key("stale");

    target.apply_snapshot(source.snapshot());

    // Old entries are gone, not merged.
    assert_eq!(target.resolve_shape_id(["stale"].into_iter()), None);
    assert_eq!(target.general_key_id("stale"), None);
    assert_eq!(target.resolve_shape_id(["baz"].into_iter()), Some(2));
    assert_eq!(target.general_key_id("qux"), Some(0));

    // Later local registrations continue past the snapshot's maxima.
    assert_eq!(target.register_shape(&["local"]), 3);
    assert_eq!(target.register_general_key("local"), (1, true));
}

#[test]
fn snapshots_travel_as_json() {
    let mut dictionary = Dictionary::new();
    dictionary.register_shape(&["foo", "bar"]);
    dictionary.register_general_key("baz");

    let snapshot = dictionary.snapshot();
    let wire = serde_json::to_string(&snapshot).unwrap();
    assert_eq!(
        wire,
        r#"{"shapes":{"1":["bar","foo"]},"general_keys":{"baz":0}}"#
    );

    let received: DictionarySnapshot = serde_json::from_str(&wire).unwrap();
    assert_eq!(received, snapshot);
}

fn counting_codec(
    options: CodecOptions,
    scheduler: ManualScheduler,
) -> (MessageCodec<ManualScheduler>, Rc<RefCell<Vec<DictionarySnapshot>>>) {
    let mut codec = MessageCodec::new(options, scheduler);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    codec.subscribe(Box::new(move |snapshot| {
        sink.borrow_mut().push(snapshot.clone());
    }));
    (codec, seen)
}

#[test]
fn zero_delay_notifies_synchronously() {
    let (mut codec, seen) = counting_codec(CodecOptions::default(), ManualScheduler::new());

    codec.register_message_type(&["foo", "bar"]);
    assert_eq!(seen.borrow().len(), 1);

    // Each freshly committed general key notifies on its own.
    codec.compress(&record(json!({"baz": true, "qux": false})));
    assert_eq!(seen.borrow().len(), 3);

    // Nothing new to commit, nothing to announce.
    codec.compress(&record(json!({"baz": true})));
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn coalescing_batches_mutations_into_one_notification() {
    let scheduler = ManualScheduler::new();
    let options = CodecOptions {
        coalesce_delay: Duration::from_millis(5),
        ..CodecOptions::default()
    };
    let (mut codec, seen) = counting_codec(options, scheduler.clone());

    codec.register_message_type(&["foo"]);
    codec.register_message_type(&["bar", "baz"]);
    codec.compress(&record(json!({"qux": true})));

    // Each mutation resets the single pending timer instead of stacking.
    assert_eq!(scheduler.pending(), 1);
    assert_eq!(scheduler.pending_delays(), [Duration::from_millis(5)]);
    assert!(seen.borrow().is_empty());

    scheduler.fire_all();
    let snapshots = seen.borrow();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert_eq!(snapshot.shapes.len(), 2);
    // The queued key was committed by the flush and rides along.
    assert_eq!(snapshot.general_keys.get("qux"), Some(&0));
}

#[test]
fn mutations_after_a_flush_notify_again() {
    let scheduler = ManualScheduler::new();
    let options = CodecOptions {
        coalesce_delay: Duration::from_millis(5),
        ..CodecOptions::default()
    };
    let (mut codec, seen) = counting_codec(options, scheduler.clone());

    codec.register_message_type(&["foo"]);
    scheduler.fire_all();
    assert_eq!(seen.borrow().len(), 1);

    codec.register_message_type(&["bar"]);
    assert_eq!(scheduler.pending(), 1);
    scheduler.fire_all();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn unsubscribing_stops_delivery() {
    let mut codec = MessageCodec::new(CodecOptions::default(), ManualScheduler::new());
    let seen = Rc::new(RefCell::new(0_usize));

    let sink = Rc::clone(&seen);
    let subscription = codec.subscribe(Box::new(move |_| {
        *sink.borrow_mut() += 1;
    }));

    codec.register_message_type(&["foo"]);
    assert_eq!(*seen.borrow(), 1);

    codec.unsubscribe(subscription);
    codec.register_message_type(&["bar"]);
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn applying_a_peer_snapshot_does_not_notify() {
    let scheduler = ManualScheduler::new();
    let (mut codec, seen) = counting_codec(CodecOptions::default(), scheduler.clone());

    let mut peer = Dictionary::new();
    peer.register_shape(&["foo"]);
    codec.handle_dictionary_update(peer.snapshot());

    assert!(seen.borrow().is_empty());
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn notified_snapshot_brings_a_peer_up_to_date() {
    let mut sender = MessageCodec::new(CodecOptions::default(), ManualScheduler::new());
    sender.register_message_type(&["foo", "bar"]);

    let mut receiver = MessageCodec::new(
        CodecOptions {
            emit_dictionary_updates: false,
            ..CodecOptions::default()
        },
        ManualScheduler::new(),
    );
    receiver.handle_dictionary_update(sender.dictionary_snapshot());

    let message = record(json!({"foo": 1, "bar": 2}));
    let token = sender.compress(&message);
    assert_eq!(receiver.decompress(&token).unwrap(), Some(message));
}
