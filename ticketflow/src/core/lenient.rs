//! Tolerant field deserializers for model-generated JSON.
//!
//! The remote service produces JSON from natural-language instructions, so a
//! ticket id may arrive as `17` or `"17"` and a list may arrive as a single
//! string. These helpers accept the reasonable variants.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Accepts a string, number or boolean; null becomes `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

/// Accepts a number or a numeric string; anything else becomes `None`.
pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts an array of scalars, a single string, or null.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(value_to_string).collect(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(other) => value_to_string(other).into_iter().collect(),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "opt_number")]
        hours: Option<f64>,
        #[serde(default, deserialize_with = "string_list")]
        tags: Vec<String>,
    }

    #[test]
    fn test_numbers_become_strings() {
        let probe: Probe = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(probe.id.as_deref(), Some("42"));
        assert!(probe.tags.is_empty());
        assert_eq!(probe.hours, None);
    }

    #[test]
    fn test_numeric_strings_become_numbers() {
        let probe: Probe = serde_json::from_str(r#"{"hours": " 12.5 "}"#).unwrap();
        assert_eq!(probe.hours, Some(12.5));

        let probe: Probe = serde_json::from_str(r#"{"hours": "n/a"}"#).unwrap();
        assert_eq!(probe.hours, None);
    }

    #[test]
    fn test_single_string_list() {
        let probe: Probe = serde_json::from_str(r#"{"tags": "call back"}"#).unwrap();
        assert_eq!(probe.tags, vec!["call back".to_string()]);

        let probe: Probe = serde_json::from_str(r#"{"tags": ["a", 2, null]}"#).unwrap();
        assert_eq!(probe.tags, vec!["a".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_nulls() {
        let probe: Probe = serde_json::from_str(r#"{"id": null, "tags": null}"#).unwrap();
        assert_eq!(probe.id, None);
        assert!(probe.tags.is_empty());
    }
}
