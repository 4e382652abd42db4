//! # Descriptor Value Tree
//!
//! A descriptor is the JSON metadata document describing a package or a
//! resource. This module fixes its in-memory representation and the rules
//! for moving caller data across the ownership boundary.
//!
//! ## Representation
//!
//! `Descriptor` is `serde_json::Map<String, Value>`. The workspace enables
//! two `serde_json` features that carry descriptor invariants:
//!
//! - `preserve_order` — descriptors are ordered-key mappings; the
//!   `resources` array and the key order of parsed documents survive
//!   round trips.
//! - `arbitrary_precision` — numbers keep their exact textual form, so
//!   large integers are not silently rewritten into scientific notation.
//!
//! ## Isolation Invariant
//!
//! Caller-supplied data enters only through [`clone_descriptor`] /
//! [`clone_value`], which serialize it into an owned `Value` tree. The
//! output shares no mutable substructure with the input, and shapes
//! outside the supported grammar are rejected with [`CloneError`] instead
//! of being aliased or coerced.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CloneError;

/// The descriptor document type: an ordered mapping from property name to
/// JSON value.
pub type Descriptor = Map<String, Value>;

/// Deep-copy caller-supplied data into an owned descriptor.
///
/// The value is passed through a structural round trip
/// (`serde_json::to_value`) that admits only the supported value grammar;
/// maps whose keys have no string form, non-finite floats, and other
/// non-round-trippable shapes fail with [`CloneError::UnsupportedShape`].
/// The root must serialize to a JSON object.
///
/// # Errors
///
/// [`CloneError::NotAnObject`] if the root is not a mapping;
/// [`CloneError::UnsupportedShape`] if any part of the tree cannot be
/// represented.
pub fn clone_descriptor<T: Serialize + ?Sized>(d: &T) -> Result<Descriptor, CloneError> {
    match clone_value(d)? {
        Value::Object(map) => Ok(map),
        other => Err(CloneError::NotAnObject {
            kind: value_kind(&other),
        }),
    }
}

/// Deep-copy caller-supplied data into an owned value tree of any root
/// shape. Same grammar rules as [`clone_descriptor`].
///
/// # Errors
///
/// [`CloneError::UnsupportedShape`] if the value cannot be represented.
pub fn clone_value<T: Serialize + ?Sized>(v: &T) -> Result<Value, CloneError> {
    serde_json::to_value(v).map_err(|e| CloneError::UnsupportedShape {
        reason: e.to_string(),
    })
}

/// Human-readable name of a JSON value's shape, for error messages.
pub fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Recursively rewrite a value tree so every mapping iterates its keys in
/// lexicographic order. Used by descriptor persistence: two logically
/// identical descriptors serialize to identical bytes regardless of the
/// order their keys were inserted in.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Look up a string-valued property.
pub fn str_prop<'a>(d: &'a Descriptor, key: &str) -> Option<&'a str> {
    d.get(key).and_then(Value::as_str)
}

/// Look up an array-valued property.
pub fn array_prop<'a>(d: &'a Descriptor, key: &str) -> Option<&'a Vec<Value>> {
    d.get(key).and_then(Value::as_array)
}

/// Look up an object-valued property.
pub fn object_prop<'a>(d: &'a Descriptor, key: &str) -> Option<&'a Descriptor> {
    d.get(key).and_then(Value::as_object)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Strategy for value trees drawn from the supported grammar.
    fn supported_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9_ ]{0,24}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(|m| {
                    Value::Object(m.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        /// Cloning any supported tree is lossless.
        #[test]
        fn clone_round_trips(value in supported_value()) {
            let tree = json!({"root": value});
            let cpy = clone_descriptor(&tree).unwrap();
            prop_assert_eq!(Value::Object(cpy), tree);
        }

        /// Sorting keys never changes the set of leaves, and is idempotent.
        #[test]
        fn sort_keys_idempotent(value in supported_value()) {
            let once = sort_keys(value);
            let twice = sort_keys(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
