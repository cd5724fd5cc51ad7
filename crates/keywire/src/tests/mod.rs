mod dictionary_sync;
mod properties;

use crate::{Map, Value};

/// Builds a record from a `serde_json::json!` literal. The `preserve_order`
/// feature keeps the literal's key order, so encounter-order assertions in
/// these tests read the way they are written.
pub(crate) fn record(value: serde_json::Value) -> Map {
    match Value::from(value) {
        Value::Object(map) => map,
        other => panic!("expected a JSON object literal, got {other:?}"),
    }
}
