//! JSON helpers shared by the request generator and response checks: folding
//! stringified JSON back into structured values, and a structural subset
//! comparison used by the default "is up to date" check.
use serde::Serialize;
use serde_json::{Map, Value};

/// True iff `s` parses as a JSON *object* (not just any JSON value — a bare
/// string or number is not considered "a JSON string" for templating
/// purposes, since there is nothing to descend into).
pub fn is_json_string(s: &str) -> bool {
    matches!(serde_json::from_str::<Value>(s.trim()), Ok(Value::Object(_)))
}

/// Best-effort parse of `s` into a JSON object; returns an empty map on any
/// failure rather than propagating an error, since callers use this to
/// opportunistically unfold body strings that may or may not be JSON.
pub fn json_string_to_map(s: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(s.trim()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Recursively walk `value`, replacing any string leaf that is itself a JSON
/// object with the parsed object, so that query expressions like
/// `.payload.body.username` work regardless of whether `body` arrived as an
/// opaque string or was already structured.
pub fn convert_json_strings_to_maps(value: &mut Value) {
    match value {
        Value::String(s) => {
            if is_json_string(s) {
                let parsed = json_string_to_map(s);
                let mut parsed = Value::Object(parsed);
                convert_json_strings_to_maps(&mut parsed);
                *value = parsed;
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                convert_json_strings_to_maps(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                convert_json_strings_to_maps(v);
            }
        }
        _ => {}
    }
}

/// Structural subset: every key/value pair in `desired` must be present in
/// `actual` with an equal value. Nested objects recurse; arrays compare
/// element-wise (same length, each element a subset in turn for objects, or
/// equal otherwise). Extra keys in `actual` are ignored.
pub fn contains(actual: &Value, desired: &Value) -> bool {
    match (actual, desired) {
        (Value::Object(actual_map), Value::Object(desired_map)) => desired_map
            .iter()
            .all(|(k, v)| actual_map.get(k).is_some_and(|av| contains(av, v))),
        (Value::Array(actual_items), Value::Array(desired_items)) => {
            actual_items.len() == desired_items.len()
                && actual_items
                    .iter()
                    .zip(desired_items.iter())
                    .all(|(a, d)| contains(a, d))
        }
        (actual, desired) => actual == desired,
    }
}

/// Marshal `v` to JSON and back into a generic object map, the same
/// round-trip the request generator uses to turn a typed payload into the
/// map the query engine operates over.
pub fn struct_to_map<T: Serialize>(v: &T) -> serde_json::Result<Map<String, Value>> {
    match serde_json::to_value(v)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}
