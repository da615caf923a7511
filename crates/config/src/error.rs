//! Error types for configuration resolution, navigation and persistence.
//!
//! Responsibilities:
//! - Define error variants for every failure the configuration layer surfaces.
//! - Wrap store errors so callers see one error type.
//!
//! Does NOT handle:
//! - Codec fallbacks: undecodable values are recovered locally and never surface.
//! - Absent sources: a missing local file or empty remote parameter contributes nothing.
//!
//! Invariants:
//! - Validation errors name schemas and keys, never values.
//! - Dotenv errors NEVER include raw env file line contents.

use std::io::ErrorKind;
use std::path::PathBuf;

use ssm_client::StoreError;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading, navigating or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No candidate schema accepted the merged input.
    #[error("Settings did not validate as {}: attempted keys [{}]: {reason}", .schemas.join(" | "), .keys.join(", "))]
    Validation {
        schemas: Vec<String>,
        keys: Vec<String>,
        reason: String,
    },

    #[error("Unsupported config format: {0} (expected json, yaml or env)")]
    UnsupportedFormat(String),

    #[error("No destination to write settings to: set an ssm path, a local path or an env file")]
    NoDestination,

    #[error("Remote settings path {path} is configured but no parameter store was provided")]
    MissingStore { path: String },

    /// A field of a node was addressed as if it were a directory.
    #[error("Cannot navigate below field '{field}' of {path}")]
    NotNavigable { path: String, field: String },

    #[error("Invalid parameter path: {0}")]
    InvalidPath(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parameter store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failed to parse an env file due to invalid syntax.
    ///
    /// Only the byte index is kept, not the offending line, to avoid leaking secrets.
    #[error("Failed to parse env file at position {error_index}")]
    DotenvParse { error_index: usize },

    #[error("Failed to read env file: {kind}")]
    DotenvIo { kind: ErrorKind },

    #[error("Unknown error while loading env file")]
    DotenvUnknown,
}

impl ConfigError {
    /// Check if this error means a remote parameter does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<dotenvy::Error> for ConfigError {
    fn from(err: dotenvy::Error) -> Self {
        match err {
            dotenvy::Error::LineParse(_, error_index) => Self::DotenvParse { error_index },
            dotenvy::Error::Io(io) => Self::DotenvIo { kind: io.kind() },
            _ => Self::DotenvUnknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_schemas_and_keys() {
        let err = ConfigError::Validation {
            schemas: vec!["AppSettings".into(), "Document".into()],
            keys: vec!["host".into(), "port".into()],
            reason: "missing field `name`".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AppSettings | Document"));
        assert!(msg.contains("host, port"));
    }

    #[test]
    fn test_dotenv_parse_error_hides_line() {
        let err: ConfigError =
            dotenvy::Error::LineParse("SECRET=\"oops".into(), 7).into();
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(!msg.contains("SECRET"));
    }

    #[test]
    fn test_not_found_passthrough() {
        let err: ConfigError = StoreError::NotFound("/a".into()).into();
        assert!(err.is_not_found());
        assert!(!ConfigError::NoDestination.is_not_found());
    }
}
