//! Settings schemas: per-type options and the declared field table.
//!
//! Responsibilities:
//! - Define [`SettingsSchema`], the trait a settings struct implements to be loadable.
//! - Describe where a schema's sources live ([`SettingsOptions`]).
//! - Discover the declared field names from serde's own struct metadata.
//!
//! Does NOT handle:
//! - Source resolution or merging (see `loader/`).
//!
//! Invariants:
//! - Field names are the serialized (renamed) names serde expects.
//! - Types deserialized through `#[serde(flatten)]` or as maps report no fields
//!   unless they override [`SettingsSchema::fields`].

pub mod coerce;

use std::cell::Cell;
use std::path::PathBuf;

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde::Serialize;

use coerce::CoerceError;

/// Where a settings type looks for its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOptions {
    /// Prepended to field names for env var and secret file lookups.
    pub env_prefix: String,
    /// Dotenv file consulted after the process environment.
    pub env_file: Option<PathBuf>,
    /// Directory holding one file per secret field.
    pub secrets_dir: Option<PathBuf>,
    pub case_sensitive: bool,
    /// Default local settings file (`~` is expanded).
    pub local_settings_path: Option<PathBuf>,
    /// Default remote settings parameter.
    pub ssm_settings_path: Option<String>,
}

impl SettingsOptions {
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_secrets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_dir = Some(path.into());
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_local_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_settings_path = Some(path.into());
        self
    }

    pub fn with_ssm_settings_path(mut self, path: impl Into<String>) -> Self {
        self.ssm_settings_path = Some(path.into());
        self
    }
}

/// A settings struct that can be resolved from layered sources.
///
/// Implementations usually only override [`SettingsSchema::options`]:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct AppSettings { host: String, #[serde(default)] port: u16 }
///
/// impl SettingsSchema for AppSettings {
///     fn options() -> SettingsOptions {
///         SettingsOptions::default().with_env_prefix("APP_")
///     }
/// }
/// ```
pub trait SettingsSchema: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn options() -> SettingsOptions {
        SettingsOptions::default()
    }

    /// Display name used in errors and logs.
    fn name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Declared field names, in declaration order.
    fn fields() -> &'static [&'static str] {
        declared_fields::<Self>()
    }
}

/// Ask serde which fields `T` declares, without constructing a `T`.
pub fn declared_fields<T: DeserializeOwned>() -> &'static [&'static str] {
    let captured = Cell::new(None);
    let _ = T::deserialize(FieldLister {
        captured: &captured,
    });
    captured.get().unwrap_or(&[])
}

/// Deserializer that records the field list of the first struct it is asked for.
struct FieldLister<'a> {
    captured: &'a Cell<Option<&'static [&'static str]>>,
}

impl<'de> Deserializer<'de> for FieldLister<'_> {
    type Error = CoerceError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("field listing only inspects structs"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.captured.set(Some(fields));
        Err(de::Error::custom("field listing"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}
