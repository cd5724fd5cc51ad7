//! keywire: a compact wire codec for JSON-like record messages.
//!
//! Repeated object keys (and, for pre-registered message shapes, entire key
//! sets) are replaced with small integer ids, producing tokens such as
//! `0[0,true,1,false]` or `1[false,null,true]`. Decompression reverses the
//! process losslessly. Savings come purely from key elision; this is neither
//! a general JSON parser nor an entropy coder.
//!
//! Two codecs stay consistent through dictionary snapshots: the compressing
//! side registers shapes and keys, coalesces changes on a deferred timer, and
//! emits one [`DictionarySnapshot`] to its subscribers; the receiving side
//! applies each snapshot as a wholesale replacement. Transport and timing are
//! host concerns, injected via [`subscribe`](MessageCodec::subscribe) and the
//! [`Scheduler`] capability.
//!
//! # Examples
//!
//! ```
//! use keywire::{CodecOptions, ManualScheduler, MessageCodec, Map, Value};
//!
//! let mut codec = MessageCodec::new(CodecOptions::default(), ManualScheduler::new());
//!
//! let mut message = Map::new();
//! message.insert("foo".into(), Value::Boolean(true));
//! message.insert("bar".into(), Value::Boolean(false));
//! message.insert("baz".into(), Value::Null);
//!
//! // Keys get ids in encounter order: foo=0, bar=1, baz=2.
//! let token = codec.compress(&message);
//! assert_eq!(token, "0[0,true,1,false,2,null]");
//! assert_eq!(codec.decompress(&token).unwrap(), Some(message));
//! ```

mod codec;
mod delimiter;
mod dictionary;
mod element;
mod error;
mod schedule;
mod value;

#[cfg(test)]
mod tests;

pub use codec::{
    CodecOptions, GENERAL_TOKEN_ID, MessageCodec, SnapshotHandler, SubscriptionId,
};
pub use delimiter::find_matching_delimiter;
pub use dictionary::{
    Dictionary, DictionarySnapshot, GeneralKeyId, ShapeId, canonical_signature,
};
pub use element::{array_element_ranges, find_element_end};
pub use error::{DecodeError, ScanError};
pub use schedule::{ManualScheduler, Scheduler, TimerCallback, TimerHandle};
pub use value::{Array, Map, Value};
