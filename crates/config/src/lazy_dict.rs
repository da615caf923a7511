//! Best-effort structured decoding of opaque text.
//!
//! Tries, in order: a JSON object, a YAML mapping, dotenv-style `KEY=VALUE` lines.
//! The first that yields a mapping wins. Nothing here returns an error; text
//! that fits none of the three becomes an empty map.

use serde_json::{Map, Value};
use tracing::debug;

/// Parse `text` into a mapping, or an empty map if it is not structured.
pub fn parse(text: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return map;
    }
    if let Ok(Value::Object(map)) = serde_yaml::from_str::<Value>(text) {
        return map;
    }
    if let Some(map) = parse_dotenv(text) {
        return map;
    }
    if !text.trim().is_empty() {
        debug!(len = text.len(), "text is not json, yaml or dotenv; treating as empty");
    }
    Map::new()
}

fn parse_dotenv(text: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for item in dotenvy::from_read_iter(text.as_bytes()) {
        let (key, value) = item.ok()?;
        map.insert(key, Value::String(value));
    }
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_object() {
        let map = parse(r#"{"a": 1, "b": {"c": [true]}}"#);
        assert_eq!(Value::Object(map), json!({"a": 1, "b": {"c": [true]}}));
    }

    #[test]
    fn test_yaml_mapping() {
        let map = parse("name: app\nport: 8080\nnested:\n  key: value\n");
        assert_eq!(
            Value::Object(map),
            json!({"name": "app", "port": 8080, "nested": {"key": "value"}})
        );
    }

    #[test]
    fn test_yaml_literal_block_keeps_newlines() {
        let map = parse("email_text: |-\n  line1\n  {{brackets}}\n");
        assert_eq!(map["email_text"], json!("line1\n{{brackets}}"));
    }

    #[test]
    fn test_dotenv_lines() {
        let map = parse("HOST=localhost\nPORT=\"5432\"\n# comment\nNAME='my app'\n");
        assert_eq!(
            Value::Object(map),
            json!({"HOST": "localhost", "PORT": "5432", "NAME": "my app"})
        );
    }

    #[test]
    fn test_non_mapping_inputs_are_empty() {
        assert!(parse("").is_empty());
        assert!(parse("[1, 2, 3]").is_empty());
        assert!(parse("42").is_empty());
        assert!(parse("just some words").is_empty());
        assert!(parse("~").is_empty());
    }
}
