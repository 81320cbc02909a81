//! JSON parsing helpers for venue responses.
//!
//! Bitkub encodes numbers inconsistently: the same field may arrive as a JSON
//! string (`"291000.5"`) in one endpoint and as a native number in another.

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.trim().parse().ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (string or number) as `i64`.
#[inline]
pub fn parse_str_i64(v: Option<&serde_json::Value>) -> Option<i64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.trim().parse().ok()
    } else {
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    }
}

/// Render an identifier that may be a string or a number as a string.
#[inline]
pub fn parse_id(v: Option<&serde_json::Value>) -> Option<String> {
    match v? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_strings() {
        let v = json!({"a": "1.5", "b": 2.5, "c": "x", "d": null});
        assert_eq!(parse_f64_field(&v, "a"), Some(1.5));
        assert_eq!(parse_f64_field(&v, "b"), Some(2.5));
        assert_eq!(parse_f64_field(&v, "c"), None);
        assert_eq!(parse_f64_field(&v, "d"), None);
        assert_eq!(parse_f64_field(&v, "missing"), None);
    }

    #[test]
    fn ids_and_timestamps() {
        assert_eq!(parse_id(Some(&json!(123))), Some("123".into()));
        assert_eq!(parse_id(Some(&json!("abc"))), Some("abc".into()));
        assert_eq!(parse_id(Some(&json!(""))), None);
        assert_eq!(parse_str_i64(Some(&json!("1707220636"))), Some(1_707_220_636));
        assert_eq!(parse_str_i64(Some(&json!(1707220636))), Some(1_707_220_636));
    }
}
