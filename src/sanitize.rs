//! Trimming of error details before they reach the logs.

use serde_json::{Map, Value};

const MAX_DEPTH: usize = 3;
const MAX_STRING_LEN: usize = 1000;
const MAX_ARRAY_ITEMS: usize = 20;
const SENSITIVE_KEYS: [&str; 7] = ["password", "token", "secret", "key", "auth", "credit", "card"];

/// Returns a copy of `data` that is safe and small enough to log.
///
/// Nesting deeper than three levels is replaced, long strings are truncated,
/// arrays are capped at twenty items and values under keys that look like
/// credentials are filtered out.
///
/// # Examples
///
/// ```
/// use pagewise::sanitize::sanitize;
/// use serde_json::json;
///
/// let clean = sanitize(&json!({"email": "a@b.c", "accessToken": "abc"}));
/// assert_eq!(clean, json!({"email": "a@b.c", "accessToken": "[FILTERED]"}));
/// ```
pub fn sanitize(data: &Value) -> Value {
    sanitize_at(data, 0)
}

fn sanitize_at(data: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::String("[DEPTH EXCEEDED]".to_string());
    }

    match data {
        Value::String(s) if s.chars().count() > MAX_STRING_LEN => {
            let truncated: String = s.chars().take(MAX_STRING_LEN).collect();
            Value::String(format!("{}... [TRUNCATED]", truncated))
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .take(MAX_ARRAY_ITEMS)
                .map(|item| sanitize_at(item, depth + 1))
                .collect(),
        ),
        Value::Object(fields) => {
            let mut clean = Map::with_capacity(fields.len());
            for (key, value) in fields {
                let lower = key.to_lowercase();
                let value = if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    Value::String("[FILTERED]".to_string())
                } else {
                    sanitize_at(value, depth + 1)
                };
                clean.insert(key.clone(), value);
            }
            Value::Object(clean)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_depth_cap() {
        let data = json!({"a": {"b": {"c": {"d": {"e": 1}}}}});
        assert_eq!(
            sanitize(&data),
            json!({"a": {"b": {"c": {"d": "[DEPTH EXCEEDED]"}}}})
        );
    }

    #[test]
    fn test_long_string_truncated() {
        let long = "x".repeat(1500);
        let Value::String(clean) = sanitize(&Value::String(long)) else {
            panic!("expected a string");
        };
        assert!(clean.ends_with("... [TRUNCATED]"));
        assert_eq!(clean.len(), 1000 + "... [TRUNCATED]".len());
    }

    #[test]
    fn test_array_capped() {
        let data = Value::Array((0..30).map(Value::from).collect());
        let Value::Array(items) = sanitize(&data) else {
            panic!("expected an array");
        };
        assert_eq!(items.len(), 20);
    }

    #[test]
    fn test_sensitive_keys_case_insensitive() {
        let data = json!({"Password": "hunter2", "cardNumber": "4242", "title": "Matilda"});
        assert_eq!(
            sanitize(&data),
            json!({"Password": "[FILTERED]", "cardNumber": "[FILTERED]", "title": "Matilda"})
        );
    }
}
