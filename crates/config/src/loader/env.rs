//! Environment, env-file and secret-file sources.
//!
//! Responsibilities:
//! - Read one variable per declared field (`<env_prefix><FIELD>`) from the process
//!   environment, falling back to the configured env file.
//! - Read one file per declared field from the secrets directory.
//! - Load the working directory's `.env` into the process (binary use only).
//!
//! Does NOT handle:
//! - Type conversion. Every value is a string; the coercing deserializer converts.
//!
//! Invariants:
//! - Empty or whitespace-only variables are treated as unset.
//! - Returned values are trimmed.
//! - The process environment wins over the env file.
//! - The `DOTENV_DISABLED` variable is checked before `dotenvy::dotenv()` is called.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::constants::DOTENV_DISABLED_ENV;
use crate::error::{ConfigError, Result};

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(non_blank)
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

/// Check if dotenv loading is disabled via environment variable.
pub fn dotenv_disabled() -> bool {
    matches!(
        std::env::var(DOTENV_DISABLED_ENV).ok().as_deref(),
        Some("true") | Some("1")
    )
}

/// Load `.env` from the working directory into the process environment, if present.
///
/// Missing files are ignored. Parse errors only report the byte position.
pub fn load_dotenv() -> Result<()> {
    if dotenv_disabled() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Read an env file into a map. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "env file not found");
            return Ok(HashMap::new());
        }
        Err(e) => return Err(e.into()),
    };
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(ConfigError::from)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn lookup<'a>(
    vars: impl IntoIterator<Item = (&'a String, &'a String)>,
    name: &str,
    case_sensitive: bool,
) -> Option<String> {
    vars.into_iter()
        .find(|(key, _)| {
            if case_sensitive {
                key.as_str() == name
            } else {
                key.eq_ignore_ascii_case(name)
            }
        })
        .and_then(|(_, value)| non_blank(value.clone()))
}

/// Values for `fields` from the process environment, then `env_file`.
pub fn env_layer(
    fields: &[&str],
    prefix: &str,
    env_file: Option<&Path>,
    case_sensitive: bool,
) -> Result<Map<String, Value>> {
    let process: HashMap<String, String> = std::env::vars().collect();
    let file = match env_file {
        Some(path) => read_env_file(path)?,
        None => HashMap::new(),
    };

    let mut layer = Map::new();
    for field in fields {
        let name = format!("{prefix}{field}");
        let found = lookup(&process, &name, case_sensitive)
            .or_else(|| lookup(&file, &name, case_sensitive));
        if let Some(value) = found {
            layer.insert((*field).to_string(), Value::String(value));
        }
    }
    Ok(layer)
}

/// Values for `fields` from files named `<prefix><field>` inside `dir`.
pub fn secrets_layer(
    fields: &[&str],
    prefix: &str,
    dir: &Path,
    case_sensitive: bool,
) -> Result<Map<String, Value>> {
    let mut layer = Map::new();
    if !dir.is_dir() {
        warn!(path = %dir.display(), "secrets directory does not exist");
        return Ok(layer);
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .collect();

    for field in fields {
        let name = format!("{prefix}{field}");
        let hit = files.iter().find(|entry| {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if case_sensitive {
                file_name == name.as_str()
            } else {
                file_name.eq_ignore_ascii_case(&name)
            }
        });
        if let Some(entry) = hit {
            let path = entry.path();
            let contents = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read { path, source })?;
            layer.insert(
                (*field).to_string(),
                Value::String(contents.trim().to_string()),
            );
        }
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_env_var_or_none_filters_blank() {
        temp_env::with_vars(
            [
                ("SSMCFG_TEST_SET", Some("  value ")),
                ("SSMCFG_TEST_BLANK", Some("   ")),
            ],
            || {
                assert_eq!(env_var_or_none("SSMCFG_TEST_SET").as_deref(), Some("value"));
                assert_eq!(env_var_or_none("SSMCFG_TEST_BLANK"), None);
                assert_eq!(env_var_or_none("SSMCFG_TEST_UNSET_XYZ"), None);
            },
        );
    }

    #[test]
    #[serial]
    fn test_process_env_beats_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "APP_HOST=from-file\nAPP_PORT=1234\n").unwrap();

        temp_env::with_vars([("APP_HOST", Some("from-env"))], || {
            let layer = env_layer(&["host", "port", "name"], "APP_", Some(&env_file), false)
                .unwrap();
            assert_eq!(layer["host"], "from-env");
            assert_eq!(layer["port"], "1234");
            assert!(!layer.contains_key("name"));
        });
    }

    #[test]
    #[serial]
    fn test_case_sensitive_env_lookup() {
        temp_env::with_vars([("app_mode", Some("lower"))], || {
            let strict = env_layer(&["MODE"], "APP_", None, true).unwrap();
            assert!(strict.is_empty());
            let loose = env_layer(&["mode"], "APP_", None, false).unwrap();
            assert_eq!(loose["mode"], "lower");
        });
    }

    #[test]
    fn test_missing_env_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join("absent.env")).unwrap().is_empty());
    }

    #[test]
    fn test_secrets_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("APP_PASSWORD"), "s3cret\n").unwrap();
        let layer = secrets_layer(&["password", "token"], "APP_", dir.path(), false).unwrap();
        assert_eq!(layer["password"], "s3cret");
        assert!(!layer.contains_key("token"));
    }

    #[test]
    fn test_missing_secrets_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layer = secrets_layer(&["x"], "", &dir.path().join("nope"), false).unwrap();
        assert!(layer.is_empty());
    }
}
