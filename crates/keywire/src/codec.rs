//! The message codec: compression, decompression, and the debounced
//! dictionary-change notification protocol.
//!
//! A [`MessageCodec`] owns one [`Dictionary`] and keeps a peer's copy
//! consistent by emitting [`DictionarySnapshot`]s to its subscribers. The
//! codec never performs I/O; snapshots reach the peer through whatever
//! transport the host wires into [`subscribe`](MessageCodec::subscribe), and
//! deferred emission runs on the injected [`Scheduler`].

use std::{cell::RefCell, mem, rc::Rc};
use std::time::Duration;

use tracing::{debug, trace};

use crate::{
    dictionary::{Dictionary, DictionarySnapshot, GeneralKeyId, ShapeId},
    element::array_element_ranges,
    error::DecodeError,
    schedule::{Scheduler, TimerHandle},
    value::{Map, Value},
};

/// The token id marking a general (shapeless) message.
pub const GENERAL_TOKEN_ID: u64 = 0;

/// Configuration for a [`MessageCodec`].
#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    /// Whether this codec registers keys and emits dictionary updates.
    ///
    /// A receive-only codec (`false`) never mutates its own dictionary and
    /// never schedules anything; it compresses with the keys it already knows
    /// and falls back to literal JSON for anything else.
    ///
    /// # Default
    ///
    /// `true`
    pub emit_dictionary_updates: bool,

    /// How long to coalesce dictionary changes before emitting one snapshot.
    ///
    /// Zero means "emit synchronously inside the mutating call". A non-zero
    /// delay batches any number of mutations into a single notification, at
    /// the cost of `compress` falling back to literal JSON for messages whose
    /// keys are not yet committed.
    ///
    /// # Default
    ///
    /// [`Duration::ZERO`]
    pub coalesce_delay: Duration,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            emit_dictionary_updates: true,
            coalesce_delay: Duration::ZERO,
        }
    }
}

/// Identifies one snapshot subscription for [`unsubscribe`].
///
/// [`unsubscribe`]: MessageCodec::unsubscribe
pub type SubscriptionId = u64;

/// A subscriber callback receiving emitted dictionary snapshots.
pub type SnapshotHandler = Box<dyn FnMut(&DictionarySnapshot)>;

/// State shared with the deferred flush callback.
struct CodecState {
    dictionary: Dictionary,
    queued_keys: Vec<String>,
    subscribers: Vec<(SubscriptionId, SnapshotHandler)>,
    next_subscription_id: SubscriptionId,
    pending_timer: Option<TimerHandle>,
}

/// Compresses and decompresses record messages against an evolving key
/// dictionary.
///
/// # Examples
///
/// ```
/// use keywire::{CodecOptions, ManualScheduler, MessageCodec, Value};
///
/// let mut codec = MessageCodec::new(CodecOptions::default(), ManualScheduler::new());
/// codec.register_message_type(&["foo", "bar", "baz"]);
///
/// let mut message = keywire::Map::new();
/// message.insert("foo".into(), Value::Boolean(true));
/// message.insert("bar".into(), Value::Boolean(false));
/// message.insert("baz".into(), Value::Null);
///
/// // Values ordered by the shape's sorted keys: bar, baz, foo.
/// assert_eq!(codec.compress(&message), "1[false,null,true]");
/// assert_eq!(codec.decompress("1[false,null,true]").unwrap(), Some(message));
/// ```
pub struct MessageCodec<S: Scheduler> {
    options: CodecOptions,
    scheduler: S,
    state: Rc<RefCell<CodecState>>,
}

impl<S: Scheduler> MessageCodec<S> {
    #[must_use]
    pub fn new(options: CodecOptions, scheduler: S) -> Self {
        Self {
            options,
            scheduler,
            state: Rc::new(RefCell::new(CodecState {
                dictionary: Dictionary::new(),
                queued_keys: Vec::new(),
                subscribers: Vec::new(),
                next_subscription_id: 0,
                pending_timer: None,
            })),
        }
    }

    /// Registers a message shape ahead of time and returns its id.
    ///
    /// Messages whose key set matches a registered shape compress without
    /// carrying any key information at all. Registration schedules a
    /// dictionary-update notification.
    pub fn register_message_type(&mut self, keys: &[&str]) -> ShapeId {
        let id = self.state.borrow_mut().dictionary.register_shape(keys);
        self.schedule_update();
        id
    }

    /// Replaces the local dictionary with a snapshot from the peer.
    ///
    /// This is wholesale replacement, not a merge; see
    /// [`Dictionary::apply_snapshot`].
    pub fn handle_dictionary_update(&mut self, snapshot: DictionarySnapshot) {
        self.state.borrow_mut().dictionary.apply_snapshot(snapshot);
    }

    /// A point-in-time copy of the local dictionary.
    #[must_use]
    pub fn dictionary_snapshot(&self) -> DictionarySnapshot {
        self.state.borrow().dictionary.snapshot()
    }

    /// Subscribes to emitted dictionary snapshots.
    ///
    /// Handlers run synchronously at notification time, in subscription
    /// order. A handler subscribed during a fan-out first runs at the next
    /// notification.
    pub fn subscribe(&mut self, handler: SnapshotHandler) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        let id = state.next_subscription_id;
        state.next_subscription_id += 1;
        state.subscribers.push((id, handler));
        id
    }

    /// Removes a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.state
            .borrow_mut()
            .subscribers
            .retain(|(subscription, _)| *subscription != id);
    }

    /// Compresses one record message into a token string.
    ///
    /// The message is classified against the dictionary: a key set matching a
    /// registered shape produces a shape token (`id >= 1`, values ordered by
    /// the shape's sorted keys), anything else a general token (`0`, with
    /// interleaved key ids and values in the message's own order). When
    /// general keys are still unknown and cannot be committed synchronously,
    /// the whole message is returned as plain literal JSON instead; the
    /// output is then not a token and decompresses to `None` on the peer.
    ///
    /// This call never blocks on the pending notification timer.
    pub fn compress(&mut self, message: &Map) -> String {
        let shape_id = {
            let state = self.state.borrow();
            state
                .dictionary
                .resolve_shape_id(message.keys().map(String::as_str))
        };
        match shape_id {
            Some(id) => self.compress_registered(message, id),
            None => self.compress_general(message),
        }
    }

    /// Shape encoding: values only, ordered by the shape's canonical keys.
    ///
    /// A value that is directly a record re-enters full classification, so a
    /// nested record may resolve to any registered shape or fall back to
    /// general encoding. Arrays stay literal, records inside them included.
    fn compress_registered(&mut self, message: &Map, id: ShapeId) -> String {
        let keys = {
            let state = self.state.borrow();
            state
                .dictionary
                .shape_keys(id)
                .expect("resolved shape id must be registered")
                .to_vec()
        };

        let mut parts = Vec::with_capacity(keys.len());
        for key in &keys {
            let value = message
                .get(key)
                .expect("message matching a shape carries every shape key");
            let fragment = match value {
                Value::Object(nested) => self.compress(nested),
                other => other.to_string(),
            };
            parts.push(fragment);
        }
        format!("{id}[{}]", parts.join(","))
    }

    /// General encoding: interleaved key-id/value pairs in message order.
    ///
    /// Nested records here are always general-encoded, never re-classified
    /// against registered shapes, even when their key set would match one.
    fn compress_general(&mut self, message: &Map) -> String {
        let unknown: Vec<String> = {
            let state = self.state.borrow();
            message
                .keys()
                .filter(|key| state.dictionary.general_key_id(key).is_none())
                .cloned()
                .collect()
        };

        if !self.options.emit_dictionary_updates {
            // A receive-only codec cannot announce new ids, so the peer would
            // never be able to resolve them. Send the message as-is.
            if !unknown.is_empty() {
                trace!(
                    unknown = unknown.len(),
                    "receive-only codec falling back to literal encoding"
                );
                return Value::Object(message.clone()).to_string();
            }
        } else if !unknown.is_empty() {
            if self.options.coalesce_delay.is_zero() {
                // Commit and announce each key immediately; the token below
                // may then use the fresh ids.
                for key in &unknown {
                    self.state.borrow_mut().dictionary.register_general_key(key);
                    self.schedule_update();
                }
            } else {
                // Coalescing: the keys are only queued, not yet committed, so
                // this call must not compress with them. Emit literally and
                // let the flush commit the queue.
                trace!(
                    queued = unknown.len(),
                    "queued unseen general keys, falling back to literal encoding"
                );
                self.state.borrow_mut().queued_keys.extend(unknown);
                self.schedule_update();
                return Value::Object(message.clone()).to_string();
            }
        }

        let mut parts = Vec::with_capacity(message.len() * 2);
        for (key, value) in message {
            let id = {
                let state = self.state.borrow();
                state
                    .dictionary
                    .general_key_id(key)
                    .expect("general key committed before encoding")
            };
            parts.push(id.to_string());
            let fragment = match value {
                Value::Object(nested) => self.compress_general(nested),
                other => other.to_string(),
            };
            parts.push(fragment);
        }
        format!("{GENERAL_TOKEN_ID}[{}]", parts.join(","))
    }

    /// Decompresses a token string back into a record message.
    ///
    /// Returns `Ok(None)` when `text` is not a compressed token (no leading
    /// `<digits>[` prefix); the caller should treat such text as a literal
    /// value. Recursion uses the same rule for nested value slots, falling
    /// back to literal JSON parsing when a slot is not a token.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`] for the failure taxonomy. Unknown shape or key ids
    /// mean this codec's dictionary is behind the encoder's.
    pub fn decompress(&self, text: &str) -> Result<Option<Map>, DecodeError> {
        let digits = text.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || text.as_bytes().get(digits) != Some(&b'[') {
            return Ok(None);
        }
        let id: u64 = text[..digits]
            .parse()
            .map_err(|_| DecodeError::TokenIdOutOfRange(text[..digits].to_string()))?;

        // The body keeps its leading '[' so the element indexer can run on it
        // directly.
        let body = &text[digits..];
        if id == GENERAL_TOKEN_ID {
            self.decompress_general(body).map(Some)
        } else {
            self.decompress_registered(body, id).map(Some)
        }
    }

    fn decompress_general(&self, body: &str) -> Result<Map, DecodeError> {
        let ranges = array_element_ranges(body)?;
        if ranges.len() % 2 != 0 {
            return Err(DecodeError::OddElementCount(ranges.len()));
        }

        let mut message = Map::with_capacity(ranges.len() / 2);
        for pair in ranges.chunks_exact(2) {
            let key_text = body[pair[0].clone()].trim();
            let key_id: GeneralKeyId = key_text
                .parse()
                .map_err(|_| DecodeError::InvalidKeyId(key_text.to_string()))?;
            let key = {
                let state = self.state.borrow();
                state
                    .dictionary
                    .general_key_name(key_id)
                    .ok_or(DecodeError::UnknownKeyId(key_id))?
                    .to_string()
            };
            let value = self.decode_value(body[pair[1].clone()].trim())?;
            message.insert(key, value);
        }
        Ok(message)
    }

    fn decompress_registered(&self, body: &str, id: ShapeId) -> Result<Map, DecodeError> {
        let keys = {
            let state = self.state.borrow();
            state
                .dictionary
                .shape_keys(id)
                .ok_or(DecodeError::UnknownShapeId(id))?
                .to_vec()
        };

        let ranges = array_element_ranges(body)?;
        if ranges.len() != keys.len() {
            return Err(DecodeError::ShapeArityMismatch {
                id,
                expected: keys.len(),
                found: ranges.len(),
            });
        }

        let mut message = Map::with_capacity(keys.len());
        for (key, range) in keys.into_iter().zip(ranges) {
            let value = self.decode_value(body[range].trim())?;
            message.insert(key, value);
        }
        Ok(message)
    }

    /// A value slot is either a nested token or a literal JSON value.
    fn decode_value(&self, raw: &str) -> Result<Value, DecodeError> {
        match self.decompress(raw)? {
            Some(nested) => Ok(Value::Object(nested)),
            None => parse_literal(raw),
        }
    }

    /// Cancels any pending notification timer and either emits synchronously
    /// (zero delay) or schedules a fresh coalescing timer. Scheduling is
    /// idempotent: repeated mutations reset the timer instead of stacking
    /// notifications.
    fn schedule_update(&mut self) {
        if !self.options.emit_dictionary_updates {
            return;
        }

        let pending = self.state.borrow_mut().pending_timer.take();
        if let Some(handle) = pending {
            self.scheduler.cancel(handle);
        }

        if self.options.coalesce_delay.is_zero() {
            flush_state(&self.state);
            return;
        }

        let weak = Rc::downgrade(&self.state);
        let handle = self.scheduler.schedule_once(
            self.options.coalesce_delay,
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    flush_state(&state);
                }
            }),
        );
        self.state.borrow_mut().pending_timer = Some(handle);
    }
}

/// Commits queued general keys and fans one snapshot out to all subscribers.
///
/// Runs either synchronously from a zero-delay mutation or from the deferred
/// timer callback. It never re-schedules, so any number of mutations before
/// the timer fires produce exactly one emitted snapshot.
fn flush_state(state: &Rc<RefCell<CodecState>>) {
    let snapshot = {
        let mut state = state.borrow_mut();
        state.pending_timer = None;
        let queued = mem::take(&mut state.queued_keys);
        for key in queued {
            state.dictionary.register_general_key(&key);
        }
        state.dictionary.snapshot()
    };
    debug!(
        shapes = snapshot.shapes.len(),
        general_keys = snapshot.general_keys.len(),
        "emitting dictionary update"
    );

    // Handlers may call back into the codec, so the subscriber list is moved
    // out for the duration of the fan-out. Subscriptions made by a handler
    // land in the fresh list and are appended afterwards.
    let mut handlers = mem::take(&mut state.borrow_mut().subscribers);
    for (_, handler) in &mut handlers {
        handler(&snapshot);
    }
    let mut state = state.borrow_mut();
    let added = mem::take(&mut state.subscribers);
    state.subscribers = handlers;
    state.subscribers.extend(added);
}

fn parse_literal(text: &str) -> Result<Value, DecodeError> {
    let parsed: serde_json::Value =
        serde_json::from_str(text).map_err(|err| DecodeError::InvalidLiteral {
            text: text.to_string(),
            reason: err.to_string(),
        })?;
    Ok(Value::from(parsed))
}
