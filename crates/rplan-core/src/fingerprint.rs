use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serializes `value` as JSON with object keys sorted at every level.
pub fn stable_json_bytes<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let raw = serde_json::to_value(value)?;
    serde_json::to_vec(&normalize_value(raw))
}

/// Hex sha256 of the stable JSON encoding; equal for values that differ only in key order.
pub fn fingerprint_hex<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let bytes = stable_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{digest:x}"))
}

fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let ordered = object
                .into_iter()
                .map(|(key, value)| (key, normalize_value(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}

#[cfg(test)]
#[path = "fingerprint_test.rs"]
mod tests;
