//! Free-form settings with no declared fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::SettingsSchema;

/// Any non-empty mapping.
///
/// Used when a file has to be carried through the settings pipeline
/// without a dedicated schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Document {
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Document {
    type Error = &'static str;

    fn try_from(values: Map<String, Value>) -> Result<Self, Self::Error> {
        if values.is_empty() {
            Err("document has no keys")
        } else {
            Ok(Self { values })
        }
    }
}

impl SettingsSchema for Document {
    fn fields() -> &'static [&'static str] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::coerce;
    use serde_json::json;

    #[test]
    fn test_document_accepts_any_mapping() {
        let doc: Document = coerce::from_value(json!({"a": 1, "b": {"c": "d"}})).unwrap();
        assert_eq!(doc.values["b"]["c"], "d");
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": 1, "b": {"c": "d"}}));
    }

    #[test]
    fn test_document_rejects_empty_and_non_mappings() {
        assert!(coerce::from_value::<Document>(json!({})).is_err());
        assert!(coerce::from_value::<Document>(json!("text")).is_err());
    }
}
