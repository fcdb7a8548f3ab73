//! List responses arrive either as a bare JSON array or as an object with
//! the array under a named field. Callers go through [`normalize_list`] so
//! they never branch on shape.

use serde_json::Value;

/// Returns the items of `body` in server order.
///
/// A bare array is returned as-is. An object yields the array under
/// `fallback_key`; a missing key, a non-array field or any other shape
/// yields an empty list.
pub fn normalize_list(body: Value, fallback_key: &str) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(fallback_key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_and_wrapped_lists_agree() {
        let items = json!([{"id": 3}, {"id": 1}, {"id": 2}]);
        let wrapped = json!({ "items": items.clone(), "total": 3 });

        let a = normalize_list(items, "items");
        let b = normalize_list(wrapped, "items");
        assert_eq!(a, b);
        let ids: Vec<i64> = a.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn missing_key_is_empty() {
        assert!(normalize_list(json!({"torrents": [1, 2]}), "jobs").is_empty());
    }

    #[test]
    fn non_array_field_is_empty() {
        assert!(normalize_list(json!({"items": {"id": 1}}), "items").is_empty());
        assert!(normalize_list(Value::Null, "items").is_empty());
        assert!(normalize_list(json!("nope"), "items").is_empty());
    }
}
