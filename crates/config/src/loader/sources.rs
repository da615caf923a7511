//! Local settings file and remote settings parameter sources.
//!
//! Responsibilities:
//! - Resolve which local file and which remote parameter to consult.
//! - Read them and parse the contents with the lazy dict parser.
//!
//! Invariants:
//! - A missing local file contributes nothing.
//! - A remote parameter with an empty decoded value contributes nothing.
//! - Other read failures propagate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::BaseDirs;
use serde_json::{Map, Value};
use ssm_client::ParameterStore;
use tracing::debug;

use crate::codec::ValueCodec;
use crate::error::{ConfigError, Result};
use crate::lazy_dict;
use crate::parameter::Parameter;

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

/// Read and parse a local settings file; `None` if it does not exist.
pub fn local_layer(path: &Path) -> Result<Option<Map<String, Value>>> {
    let path = expand_home(path);
    if !path.exists() {
        debug!(path = %path.display(), "local settings file not found");
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "read local settings");
    Ok(Some(lazy_dict::parse(&text)))
}

/// Fetch and parse a remote settings parameter; `None` if its value is empty.
pub fn remote_layer(
    store: &dyn ParameterStore,
    path: &str,
    codec: &ValueCodec,
) -> Result<Option<(Map<String, Value>, Arc<Parameter>)>> {
    let parameter = Parameter::fetch(store, path, "")?.with_codec(codec.clone());
    if parameter.decoded_value().is_empty() {
        debug!(path, "remote settings parameter is empty");
        return Ok(None);
    }
    let layer = parameter.lazy_dict();
    debug!(path, keys = layer.len(), "read remote settings");
    Ok(Some((layer, Arc::new(parameter))))
}

/// Rename keys to the declared field they match ignoring case, lowercasing the rest.
pub fn fold_case(layer: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    layer
        .into_iter()
        .map(|(key, value)| {
            let folded = fields
                .iter()
                .find(|f| f.eq_ignore_ascii_case(&key))
                .map_or_else(|| key.to_lowercase(), |f| (*f).to_string());
            (folded, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ssm_client::MemoryStore;

    #[test]
    fn test_missing_local_file_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(local_layer(&dir.path().join("missing.yaml")).unwrap().is_none());
    }

    #[test]
    fn test_local_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "host: db\nport: 5432\n").unwrap();
        let layer = local_layer(&path).unwrap().unwrap();
        assert_eq!(Value::Object(layer), json!({"host": "db", "port": 5432}));
    }

    #[test]
    fn test_empty_remote_contributes_nothing() {
        let store = MemoryStore::new();
        store.insert("/empty", "");
        assert!(remote_layer(&store, "/empty", &ValueCodec::default())
            .unwrap()
            .is_none());
        assert!(remote_layer(&store, "/missing", &ValueCodec::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_remote_layer_carries_origin() {
        let store = MemoryStore::new();
        store.insert("/app/config", "{\"host\": \"remote\"}");
        let (layer, origin) = remote_layer(&store, "/app/config", &ValueCodec::default())
            .unwrap()
            .unwrap();
        assert_eq!(layer["host"], "remote");
        assert_eq!(origin.name(), "/app/config");
    }

    #[test]
    fn test_fold_case_prefers_declared_names() {
        let layer = match json!({"HOST": 1, "listenport": 2, "Other": 3}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let folded = fold_case(layer, &["host", "listenPort"]);
        assert_eq!(
            Value::Object(folded),
            json!({"host": 1, "listenPort": 2, "other": 3})
        );
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home(Path::new("/etc/app.yaml")), PathBuf::from("/etc/app.yaml"));
        let expanded = expand_home(Path::new("~/app.yaml"));
        assert!(!expanded.starts_with("~"));
    }
}
