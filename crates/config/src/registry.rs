//! Ordered registry of settings schemas.
//!
//! Turns an arbitrary mapping, parameter or file into whichever registered
//! schema accepts it. The most recently registered schema is tried first.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use ssm_client::ParameterStore;
use tracing::debug;

use crate::codec::ValueCodec;
use crate::error::{ConfigError, Result};
use crate::lazy_dict;
use crate::loader::expand_home;
use crate::parameter::Parameter;
use crate::schema::SettingsSchema;
use crate::settings::{AnySettings, Settings};

type Builder = fn(Map<String, Value>, &Binding) -> Result<Box<dyn AnySettings>>;

/// What every produced settings value is attached to.
struct Binding {
    store: Option<Arc<dyn ParameterStore>>,
    codec: ValueCodec,
    origin: Option<Arc<Parameter>>,
}

struct Entry {
    name: &'static str,
    build: Builder,
}

fn build<T: SettingsSchema>(
    input: Map<String, Value>,
    binding: &Binding,
) -> Result<Box<dyn AnySettings>> {
    let mut settings = Settings::<T>::from_mapping(input)?.with_codec(binding.codec.clone());
    if let Some(store) = &binding.store {
        settings = settings.with_store(store.clone());
    }
    if let Some(origin) = &binding.origin {
        settings = settings.with_origin(origin.clone());
    }
    Ok(Box::new(settings))
}

/// Settings types that [`SchemaRegistry::from_mapping`] may produce.
#[derive(Default)]
pub struct SchemaRegistry {
    entries: Vec<Entry>,
    store: Option<Arc<dyn ParameterStore>>,
    codec: ValueCodec,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.names())
            .finish_non_exhaustive()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Later registrations take precedence.
    pub fn register<T: SettingsSchema>(mut self) -> Self {
        self.entries.push(Entry {
            name: T::name(),
            build: build::<T>,
        });
        self
    }

    /// Store attached to produced settings (used when writing them back).
    pub fn with_store(mut self, store: Arc<dyn ParameterStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Registered schema names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn first_match(
        &self,
        input: Map<String, Value>,
        origin: Option<Arc<Parameter>>,
    ) -> Result<Box<dyn AnySettings>> {
        let binding = Binding {
            store: self.store.clone(),
            codec: self.codec.clone(),
            origin,
        };
        for entry in self.entries.iter().rev() {
            match (entry.build)(input.clone(), &binding) {
                Ok(settings) => {
                    debug!(schema = entry.name, "input matched schema");
                    return Ok(settings);
                }
                Err(ConfigError::Validation { .. }) => {
                    debug!(schema = entry.name, "input did not match schema");
                }
                Err(e) => return Err(e),
            }
        }
        let mut keys: Vec<String> = input.keys().cloned().collect();
        keys.sort();
        Err(ConfigError::Validation {
            schemas: self.entries.iter().rev().map(|e| e.name.to_string()).collect(),
            keys,
            reason: "no registered schema accepted the input".to_string(),
        })
    }

    /// Validate a mapping against the registered schemas.
    pub fn from_mapping(&self, input: Map<String, Value>) -> Result<Box<dyn AnySettings>> {
        self.first_match(input, None)
    }

    /// Validate a parameter's decoded value and attach the parameter as the origin.
    pub fn from_parameter(&self, parameter: Parameter) -> Result<Box<dyn AnySettings>> {
        let input = parameter.lazy_dict();
        self.first_match(input, Some(Arc::new(parameter)))
    }

    /// Fetch `name` from the registry's store and validate it.
    pub fn fetch(&self, name: &str) -> Result<Box<dyn AnySettings>> {
        let store = self.store.as_deref().ok_or_else(|| ConfigError::MissingStore {
            path: name.to_string(),
        })?;
        let parameter = Parameter::fetch(store, name, "")?.with_codec(self.codec.clone());
        self.from_parameter(parameter)
    }

    /// Read and validate a local file (JSON, YAML or dotenv text).
    pub fn from_file(&self, path: &Path) -> Result<Box<dyn AnySettings>> {
        let path = expand_home(path);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        self.from_text(&text)
    }

    /// Validate text parsed by the lazy dict parser.
    pub fn from_text(&self, text: &str) -> Result<Box<dyn AnySettings>> {
        self.first_match(lazy_dict::parse(text), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use ssm_client::MemoryStore;

    #[derive(Debug, Serialize, Deserialize)]
    struct Db {
        host: String,
        port: u16,
    }
    impl SettingsSchema for Db {}

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Cache {
        host: String,
    }
    impl SettingsSchema for Cache {}

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_newest_schema_wins() {
        let registry = SchemaRegistry::new().register::<Db>().register::<Cache>();
        let settings = registry.from_mapping(obj(json!({"host": "h"}))).unwrap();
        assert_eq!(settings.schema_name(), "Cache");

        let settings = registry
            .from_mapping(obj(json!({"host": "h", "port": "5432"})))
            .unwrap();
        assert_eq!(settings.downcast_ref::<Db>().unwrap().port, 5432);
    }

    #[test]
    fn test_no_match_lists_every_schema() {
        let registry = SchemaRegistry::new().register::<Db>().register::<Cache>();
        let err = registry.from_mapping(obj(json!({"port": 1}))).unwrap_err();
        match err {
            ConfigError::Validation { schemas, keys, .. } => {
                assert_eq!(schemas, vec!["Cache", "Db"]);
                assert_eq!(keys, vec!["port"]);
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_from_parameter_sets_origin() {
        let registry = SchemaRegistry::new().register::<Db>();
        let parameter = Parameter::from_logical("/app/db", "host: h\nport: 1\n");
        let settings = registry.from_parameter(parameter).unwrap();
        assert_eq!(settings.origin().unwrap().name(), "/app/db");
    }

    #[test]
    fn test_fetch_uses_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert("/app/doc", "{\"anything\": true}");
        let registry = SchemaRegistry::new()
            .register::<Document>()
            .with_store(store.clone());
        let settings = registry.fetch("/app/doc").unwrap();
        let doc = settings.downcast_ref::<Document>().unwrap();
        assert_eq!(doc.values["anything"], true);
        assert_eq!(settings.origin().unwrap().name(), "/app/doc");
    }

    #[test]
    fn test_from_file_dotenv_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.env");
        std::fs::write(&path, "HOST=h\nPORT=2\n").unwrap();
        let registry = SchemaRegistry::new().register::<Document>();
        let settings = registry.from_file(&path).unwrap();
        let doc = settings.downcast_ref::<Document>().unwrap();
        assert_eq!(doc.values["HOST"], "h");
    }
}
