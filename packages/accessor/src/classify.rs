//! Shape classification of raw collection data.
//!
//! Classification always runs on the raw, unwrapped reference — never on a
//! value that has passed through the host's reactive wrapping, because
//! that wrapping can itself trigger re-entrant access.

use serde_json::{Map, Value};

/// The shape of a raw value, deciding which view gets built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A sequence: native JSON array or an array-like object.
    Array,
    /// A plain object navigated by key.
    Object,
    /// Everything else; passed through unwrapped.
    Scalar,
}

/// Classify a raw value.
///
/// The host's own wrapping may present sequences as objects that expose a
/// numeric `length` plus integer index keys; those classify as `Array`.
/// An object that looks like such a sequence but whose index range is
/// incomplete is ambiguous and falls back to `Scalar` passthrough rather
/// than a guess. A plain record that merely happens to carry a `length`
/// field stays an `Object`.
pub fn classify(raw: &Value) -> Shape {
    match raw {
        Value::Array(_) => Shape::Array,
        Value::Object(map) => {
            if array_like_len(map).is_some() {
                Shape::Array
            } else if looks_like_sequence(map) {
                Shape::Scalar
            } else {
                Shape::Object
            }
        }
        _ => Shape::Scalar,
    }
}

/// Whether the object advertises the sequence contract at all: a numeric
/// `length` member alongside at least one integer index key.
fn looks_like_sequence(map: &Map<String, Value>) -> bool {
    map.get("length").is_some_and(Value::is_number)
        && map
            .keys()
            .any(|key| key != "length" && key.parse::<usize>().is_ok())
}

/// Length of an array-like object: a non-negative integer `length` member
/// with every index key in `0..length` present. `None` otherwise.
pub(crate) fn array_like_len(map: &Map<String, Value>) -> Option<usize> {
    let len = map.get("length")?.as_u64()?;
    let len = usize::try_from(len).ok()?;
    for index in 0..len {
        if !map.contains_key(index.to_string().as_str()) {
            return None;
        }
    }
    Some(len)
}
