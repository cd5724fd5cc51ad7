//! The synchronized key dictionary.
//!
//! A [`Dictionary`] holds two id spaces: registered message *shapes* (sorted
//! key sets, ids starting at 1) and individually registered *general keys*
//! (ids starting at 0). Both are assigned sequentially and never reused or
//! renumbered; the only way entries disappear is a wholesale snapshot
//! replacement from a peer.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifies a registered message shape. Always `>= 1`; `0` on the wire
/// marks a general message instead.
pub type ShapeId = u64;

/// Identifies an individually registered key name. Starts at `0`.
pub type GeneralKeyId = u64;

/// The canonical signature of a key set: keys sorted ascending, joined with
/// commas. Two key sets resolve to the same shape exactly when their
/// signatures are equal.
///
/// # Examples
///
/// ```
/// use keywire::canonical_signature;
///
/// assert_eq!(canonical_signature(&["foo", "bar", "baz"]), "bar,baz,foo");
/// ```
#[must_use]
pub fn canonical_signature(keys: &[&str]) -> String {
    let mut sorted: Vec<&str> = keys.to_vec();
    sorted.sort_unstable();
    sorted.join(",")
}

/// A complete, self-contained rendering of one codec's dictionary, used to
/// bring a peer up to date by full replacement.
///
/// Serializes as a pair of plain maps so it can travel over any transport
/// that carries JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    /// Shape id to the shape's keys in canonical (sorted) order.
    pub shapes: BTreeMap<ShapeId, Vec<String>>,
    /// Key name to its general key id.
    pub general_keys: BTreeMap<String, GeneralKeyId>,
}

/// The mutable, versioned mapping state of one codec.
#[derive(Debug)]
pub struct Dictionary {
    shapes: BTreeMap<ShapeId, Vec<String>>,
    signatures: HashMap<String, ShapeId>,
    keys_to_ids: HashMap<String, GeneralKeyId>,
    ids_to_keys: HashMap<GeneralKeyId, String>,
    next_shape_id: ShapeId,
    next_general_key_id: GeneralKeyId,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shapes: BTreeMap::new(),
            signatures: HashMap::new(),
            keys_to_ids: HashMap::new(),
            ids_to_keys: HashMap::new(),
            next_shape_id: 1,
            next_general_key_id: 0,
        }
    }

    /// Registers a message shape and returns its freshly assigned id.
    ///
    /// The key set is canonicalized (sorted ascending, duplicates dropped)
    /// before storage. Every call allocates a new id, even for a key set that
    /// was registered before; the signature lookup then resolves to the
    /// newest id, while superseded ids keep decoding tokens in flight.
    pub fn register_shape(&mut self, keys: &[&str]) -> ShapeId {
        let mut sorted: Vec<String> = keys.iter().map(ToString::to_string).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let id = self.next_shape_id;
        self.next_shape_id += 1;

        let signature = sorted.join(",");
        debug!(id, signature = %signature, "registered message shape");
        self.shapes.insert(id, sorted);
        self.signatures.insert(signature, id);
        id
    }

    /// Resolves a message's own key set to a registered shape id, or `None`
    /// when the message must be treated as a general message.
    pub fn resolve_shape_id<'a>(&self, keys: impl Iterator<Item = &'a str>) -> Option<ShapeId> {
        let mut sorted: Vec<&str> = keys.collect();
        sorted.sort_unstable();
        self.signatures.get(&sorted.join(",")).copied()
    }

    /// The canonical (sorted) key list of a registered shape.
    #[must_use]
    pub fn shape_keys(&self, id: ShapeId) -> Option<&[String]> {
        self.shapes.get(&id).map(Vec::as_slice)
    }

    /// Registers a general key, returning its id and whether it was newly
    /// assigned. An already-known key keeps its existing id.
    pub fn register_general_key(&mut self, key: &str) -> (GeneralKeyId, bool) {
        if let Some(&id) = self.keys_to_ids.get(key) {
            return (id, false);
        }
        let id = self.next_general_key_id;
        self.next_general_key_id += 1;
        debug!(id, key, "registered general key");
        self.keys_to_ids.insert(key.to_string(), id);
        self.ids_to_keys.insert(id, key.to_string());
        (id, true)
    }

    #[must_use]
    pub fn general_key_id(&self, key: &str) -> Option<GeneralKeyId> {
        self.keys_to_ids.get(key).copied()
    }

    #[must_use]
    pub fn general_key_name(&self, id: GeneralKeyId) -> Option<&str> {
        self.ids_to_keys.get(&id).map(String::as_str)
    }

    /// Produces an immutable, fully expanded view suitable for transmission.
    #[must_use]
    pub fn snapshot(&self) -> DictionarySnapshot {
        DictionarySnapshot {
            shapes: self.shapes.clone(),
            general_keys: self
                .keys_to_ids
                .iter()
                .map(|(key, &id)| (key.clone(), id))
                .collect(),
        }
    }

    /// Replaces the entire dictionary with the given snapshot.
    ///
    /// This is a full replacement, not a merge: entries absent from the
    /// snapshot are gone afterwards. Both reverse-lookup indices are rebuilt
    /// and the sequential id counters advance past the snapshot's maxima so
    /// that ids are never reused by later local registrations.
    pub fn apply_snapshot(&mut self, snapshot: DictionarySnapshot) {
        debug!(
            shapes = snapshot.shapes.len(),
            general_keys = snapshot.general_keys.len(),
            "applying dictionary snapshot"
        );
        let DictionarySnapshot {
            shapes,
            general_keys,
        } = snapshot;

        self.signatures = shapes
            .iter()
            .map(|(&id, keys)| (keys.join(","), id))
            .collect();
        self.next_shape_id = shapes.keys().max().map_or(1, |&max| max + 1);
        self.shapes = shapes;

        self.ids_to_keys = general_keys
            .iter()
            .map(|(key, &id)| (id, key.clone()))
            .collect();
        self.next_general_key_id = general_keys.values().max().map_or(0, |&max| max + 1);
        self.keys_to_ids = general_keys.into_iter().collect();
    }
}
