//! Deep merge of settings layers.
//!
//! Nested maps merge key by key; every other value in a higher layer replaces the
//! lower one. Arrays are replaced whole, never concatenated.

use serde_json::{Map, Value};

/// Merge `overlay` into `base`; `overlay` wins on conflicts.
///
/// A `null` in the overlay means "not specified" and keeps the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_maps(base_map, overlay_map))
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Map form of [`deep_merge`].
pub fn merge_maps(
    mut base: Map<String, Value>,
    overlay: Map<String, Value>,
) -> Map<String, Value> {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    base
}

/// Merge layers given highest priority first.
pub fn merge_by_priority(
    layers: impl IntoIterator<Item = Map<String, Value>>,
) -> Map<String, Value> {
    let layers: Vec<_> = layers.into_iter().collect();
    layers.into_iter().rev().fold(Map::new(), merge_maps)
}
