//! Validated settings plus where they came from.

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::{Map, Value};
use ssm_client::ParameterStore;

use crate::codec::ValueCodec;
use crate::constants::ORIGIN_KEY;
use crate::error::{ConfigError, Result};
use crate::export::{ExportFormat, ExportOptions, WriteTarget};
use crate::parameter::Parameter;
use crate::schema::coerce;
use crate::schema::{SettingsOptions, SettingsSchema};

/// A validated settings value.
///
/// Holds the parameter it was loaded from (if any) and the store used to write it back.
pub struct Settings<T> {
    inner: T,
    options: SettingsOptions,
    origin: Option<Arc<Parameter>>,
    store: Option<Arc<dyn ParameterStore>>,
    codec: ValueCodec,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Settings<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("inner", &self.inner)
            .field("origin", &self.origin.as_ref().map(|p| p.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl<T: SettingsSchema> Settings<T> {
    /// Wrap an already built value, using the schema's default options.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            options: T::options(),
            origin: None,
            store: None,
            codec: ValueCodec::default(),
        }
    }

    /// Validate `input` as `T`.
    ///
    /// The reserved origin key is dropped first. Errors list keys, never values.
    pub fn validate(mut input: Map<String, Value>) -> Result<T> {
        input.remove(ORIGIN_KEY);
        let keys: Vec<String> = input.keys().cloned().collect();
        coerce::from_value(Value::Object(input)).map_err(|e| ConfigError::Validation {
            schemas: vec![T::name().to_string()],
            keys,
            reason: e.to_string(),
        })
    }

    pub fn from_mapping(input: Map<String, Value>) -> Result<Self> {
        Self::validate(input).map(Self::new)
    }

    pub fn with_options(mut self, options: SettingsOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_origin(mut self, origin: Arc<Parameter>) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ParameterStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn options(&self) -> &SettingsOptions {
        &self.options
    }

    /// The parameter these settings were loaded from.
    pub fn origin(&self) -> Option<&Arc<Parameter>> {
        self.origin.as_ref()
    }

    pub fn store(&self) -> Option<&Arc<dyn ParameterStore>> {
        self.store.as_ref()
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Settings<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Settings<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// Type-erased settings, as produced by a schema registry.
pub trait AnySettings: Send + Sync {
    /// Name of the schema that accepted the input.
    fn schema_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn origin(&self) -> Option<&Arc<Parameter>>;

    fn export(&self, format: ExportFormat, options: ExportOptions) -> Result<String>;

    fn to_parameter(
        &self,
        format: ExportFormat,
        ssm_path: Option<&str>,
        ignore_current: bool,
    ) -> Result<Parameter>;

    fn write_config(&self, format: ExportFormat, target: WriteTarget) -> Result<()>;
}

impl<T: SettingsSchema> AnySettings for Settings<T> {
    fn schema_name(&self) -> &'static str {
        T::name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn origin(&self) -> Option<&Arc<Parameter>> {
        Settings::origin(self)
    }

    fn export(&self, format: ExportFormat, options: ExportOptions) -> Result<String> {
        Settings::export(self, format, options)
    }

    fn to_parameter(
        &self,
        format: ExportFormat,
        ssm_path: Option<&str>,
        ignore_current: bool,
    ) -> Result<Parameter> {
        Settings::to_parameter(self, format, ssm_path, ignore_current)
    }

    fn write_config(&self, format: ExportFormat, target: WriteTarget) -> Result<()> {
        Settings::write_config(self, format, target)
    }
}

impl std::fmt::Debug for dyn AnySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnySettings")
            .field("schema", &self.schema_name())
            .field("origin", &self.origin().map(|p| p.name()))
            .finish_non_exhaustive()
    }
}

impl dyn AnySettings {
    /// Recover the concrete settings type.
    pub fn downcast_ref<T: SettingsSchema>(&self) -> Option<&Settings<T>> {
        self.as_any().downcast_ref::<Settings<T>>()
    }
}
