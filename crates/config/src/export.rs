//! Serialize validated settings back to text and persist them.
//!
//! Responsibilities:
//! - Render settings as JSON, YAML or shell-style `KEY=VALUE` lines.
//! - Drop fields that are unset or equal to their default.
//! - Route a write to exactly one sink: remote parameter, local file or env file.
//!
//! Does NOT handle:
//! - Deciding which schema the text belongs to (see `registry.rs`).
//!
//! Invariants:
//! - A field's default is whatever validation fills in when the field is omitted.
//! - Env output keys are `(env_prefix + field)` upper-cased.
//! - Every write logs the sink it went to.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::info;

use crate::constants::ORIGIN_KEY;
use crate::error::{ConfigError, Result};
use crate::loader::expand_home;
use crate::parameter::Parameter;
use crate::schema::SettingsSchema;
use crate::schema::coerce;
use crate::settings::Settings;

/// Text format for exported settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Json,
    #[default]
    Yaml,
    /// `KEY=value` lines, values shell-quoted when needed. Keys are the
    /// settings type's env prefix plus the field name, upper-cased (`mail_` +
    /// `host` gives `MAIL_HOST`), so the output reads back through the
    /// environment source.
    Env,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Env => "env",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "env" => Ok(Self::Env),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Knobs for [`Settings::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Leave out the originating parameter's name.
    pub exclude_origin: bool,
    /// Pass the output through the value codec.
    pub wire_safe: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            exclude_origin: true,
            wire_safe: false,
        }
    }
}

impl ExportOptions {
    pub fn wire_safe() -> Self {
        Self {
            wire_safe: true,
            ..Self::default()
        }
    }
}

/// Explicit destinations for [`Settings::write_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteTarget {
    pub ssm_path: Option<String>,
    pub local_path: Option<PathBuf>,
}

impl WriteTarget {
    pub fn ssm(path: impl Into<String>) -> Self {
        Self {
            ssm_path: Some(path.into()),
            local_path: None,
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            ssm_path: None,
            local_path: Some(path.into()),
        }
    }
}

/// Quote `value` for a POSIX shell, leaving simple words bare.
pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r#"'"'"'"#))
    }
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render(map: &Map<String, Value>, format: ExportFormat, env_prefix: &str) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string(map)?),
        ExportFormat::Yaml => Ok(serde_yaml::to_string(map)?),
        ExportFormat::Env => {
            let mut out = String::new();
            for (key, value) in map {
                let name = format!("{env_prefix}{key}").to_uppercase();
                out.push_str(&name);
                out.push('=');
                out.push_str(&shell_quote(&env_value(value)));
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl<T: SettingsSchema> Settings<T> {
    /// Fields that are set and differ from their defaults, by serialized name.
    pub fn non_default_fields(&self) -> Result<Map<String, Value>> {
        let full = match serde_json::to_value(&**self)? {
            Value::Object(map) => map,
            _ => {
                return Err(ConfigError::Serialization(format!(
                    "{} did not serialize to a mapping",
                    T::name()
                )));
            }
        };

        let mut kept = Map::new();
        for (key, value) in &full {
            if value.is_null() {
                continue;
            }
            let mut without = full.clone();
            without.remove(key);
            let default = coerce::from_value::<T>(Value::Object(without))
                .ok()
                .and_then(|d| serde_json::to_value(d).ok());
            let is_default = default
                .as_ref()
                .and_then(|d| d.get(key))
                .is_some_and(|d| d == value);
            if !is_default {
                kept.insert(key.clone(), value.clone());
            }
        }
        Ok(kept)
    }

    /// Render the settings as text.
    ///
    /// Env output prefixes every key with the env prefix; see [`ExportFormat::Env`].
    pub fn export(&self, format: ExportFormat, options: ExportOptions) -> Result<String> {
        let mut map = self.non_default_fields()?;
        if !options.exclude_origin
            && let Some(origin) = self.origin()
        {
            map.insert(ORIGIN_KEY.to_string(), Value::String(origin.name().to_string()));
        }
        let text = render(&map, format, &self.options().env_prefix)?;
        if options.wire_safe {
            Ok(self.codec().encode_for_wire(&text))
        } else {
            Ok(text)
        }
    }

    /// The parameter a remote write would send, without sending it.
    ///
    /// With `ssm_path` the target is fetched (keeping its metadata) unless
    /// `ignore_current` is set; otherwise the origin parameter is used.
    pub fn to_parameter(
        &self,
        format: ExportFormat,
        ssm_path: Option<&str>,
        ignore_current: bool,
    ) -> Result<Parameter> {
        let mut parameter = match ssm_path {
            Some(path) if ignore_current => Parameter::new(path, "").with_codec(self.codec().clone()),
            Some(path) => {
                let store = self.store().ok_or_else(|| ConfigError::MissingStore {
                    path: path.to_string(),
                })?;
                Parameter::fetch(store.as_ref(), path, "")?.with_codec(self.codec().clone())
            }
            None => match self.origin() {
                Some(origin) => Parameter::clone(origin),
                None => return Err(ConfigError::NoDestination),
            },
        };
        let text = self.export(format, ExportOptions::default())?;
        parameter.set_logical_value(&text);
        Ok(parameter)
    }

    /// Persist the settings to exactly one sink.
    ///
    /// Order: explicit `ssm_path`, then the origin parameter (unless `format`
    /// is env), then an explicit or configured local path, then the env file.
    pub fn write_config(&self, format: ExportFormat, target: WriteTarget) -> Result<()> {
        let remote = match (&target.ssm_path, self.origin()) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(origin)) if format != ExportFormat::Env => Some(origin.name().to_string()),
            _ => None,
        };
        if let Some(path) = remote {
            let store = self
                .store()
                .ok_or_else(|| ConfigError::MissingStore { path: path.clone() })?;
            let mut parameter = self.to_parameter(format, target.ssm_path.as_deref(), false)?;
            let version = parameter.write(store.as_ref(), None)?;
            info!(sink = "ssm", path = %path, format = %format, version, "wrote settings");
            return Ok(());
        }

        let local = target
            .local_path
            .clone()
            .or_else(|| self.options().local_settings_path.clone());
        if let Some(path) = local {
            let path = expand_home(&path);
            write_file(&path, &self.export(format, ExportOptions::default())?)?;
            info!(sink = "local", path = %path.display(), format = %format, "wrote settings");
            return Ok(());
        }

        if let Some(path) = &self.options().env_file {
            let path = expand_home(path);
            write_file(&path, &self.export(ExportFormat::Env, ExportOptions::default())?)?;
            info!(sink = "env_file", path = %path.display(), "wrote settings");
            return Ok(());
        }

        Err(ConfigError::NoDestination)
    }
}
