//! Free-text filtering for collection listings.
//!
//! A query matches a document when it occurs, ignoring case, inside the text
//! of any value in the document's data. Nested objects and arrays are walked;
//! object keys are never searched. Strings match on their raw text, numbers
//! and booleans on their JSON text (`42`, `true`), and `null` never matches.
//! An empty query matches every document.

use serde_json::{Map, Value};

/// A prepared, case-folded text query.
#[derive(Debug, Clone)]
pub struct TextQuery {
    needle: String,
}

impl TextQuery {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.to_lowercase(),
        }
    }

    /// Returns true if the query matches any value in `data`.
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        data.values().any(|value| self.matches_value(value))
    }

    fn matches_value(&self, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Bool(b) => self.contains(if *b { "true" } else { "false" }),
            Value::Number(n) => self.contains(&n.to_string()),
            Value::String(s) => self.contains(s),
            Value::Array(items) => items.iter().any(|v| self.matches_value(v)),
            Value::Object(map) => map.values().any(|v| self.matches_value(v)),
        }
    }

    fn contains(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    #[test]
    fn test_matches_string_value_case_insensitive() {
        let doc = data(json!({"title": "Filter me"}));
        assert!(TextQuery::new("filter").matches(&doc));
        assert!(TextQuery::new("FILTER ME").matches(&doc));
        assert!(!TextQuery::new("hello").matches(&doc));
    }

    #[test]
    fn test_keys_are_not_searched() {
        let doc = data(json!({"filter": "nothing here"}));
        assert!(!TextQuery::new("filter").matches(&doc));
    }

    #[test]
    fn test_nested_values_are_searched() {
        let doc = data(json!({
            "tags": ["demo", "node"],
            "meta": {"author": {"name": "Ada"}}
        }));
        assert!(TextQuery::new("nod").matches(&doc));
        assert!(TextQuery::new("ada").matches(&doc));
        assert!(!TextQuery::new("author").matches(&doc));
    }

    #[test]
    fn test_scalars_match_on_json_text() {
        let doc = data(json!({"extra": 42, "flag": true, "gone": null}));
        assert!(TextQuery::new("42").matches(&doc));
        assert!(TextQuery::new("tru").matches(&doc));
        assert!(!TextQuery::new("null").matches(&doc));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(TextQuery::new("").matches(&Map::new()));
    }
}
