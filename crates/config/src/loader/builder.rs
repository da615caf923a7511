//! Configuration loader builder implementation.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` that resolves one settings type.
//! - Merge explicit values, the local settings file, the remote settings
//!   parameter, the environment and the secrets directory.
//! - Validate the merged mapping and attach the originating parameter.
//!
//! Does NOT handle:
//! - Environment and secret file parsing (delegated to env.rs).
//! - Reading the local file and remote parameter (delegated to sources.rs).
//! - Writing settings back (see `export.rs`).
//!
//! Invariants / Assumptions:
//! - Builder values beat the local file, which beats the remote parameter,
//!   which beats the environment, which beats secret files.
//! - Lower layers only fill gaps; nested maps merge key by key.
//! - The reserved origin key never reaches validation.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use ssm_client::ParameterStore;
use tracing::debug;

use super::env::{env_layer, env_var_or_none, secrets_layer};
use super::merge::merge_by_priority;
use super::sources::{fold_case, local_layer, remote_layer};
use crate::codec::ValueCodec;
use crate::constants::{LOCAL_SETTINGS_PATH_ENV, SSM_SETTINGS_PATH_ENV};
use crate::error::{ConfigError, Result};
use crate::parameter::Parameter;
use crate::schema::{SettingsOptions, SettingsSchema};
use crate::settings::Settings;

/// Resolves a `T` from its layered sources.
pub struct ConfigLoader<T> {
    options: SettingsOptions,
    explicit: Map<String, Value>,
    local_path: Option<PathBuf>,
    ssm_path: Option<String>,
    store: Option<Arc<dyn ParameterStore>>,
    codec: ValueCodec,
    _schema: PhantomData<fn() -> T>,
}

impl<T: SettingsSchema> Default for ConfigLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SettingsSchema> ConfigLoader<T> {
    /// Create a loader using the schema's own options.
    pub fn new() -> Self {
        Self {
            options: T::options(),
            explicit: Map::new(),
            local_path: None,
            ssm_path: None,
            store: None,
            codec: ValueCodec::default(),
            _schema: PhantomData,
        }
    }

    pub fn with_options(mut self, options: SettingsOptions) -> Self {
        self.options = options;
        self
    }

    /// Store used to fetch the remote parameter and later to write back.
    pub fn with_store(mut self, store: Arc<dyn ParameterStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set one explicit value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.explicit.insert(key.into(), value.into());
        self
    }

    /// Add explicit values; later calls win over earlier ones.
    pub fn with_values(mut self, values: Map<String, Value>) -> Self {
        self.explicit.extend(values);
        self
    }

    /// Override the local settings file path.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Override the remote settings parameter path.
    pub fn with_ssm_path(mut self, path: impl Into<String>) -> Self {
        self.ssm_path = Some(path.into());
        self
    }

    fn resolve_local_path(&self) -> Option<PathBuf> {
        self.local_path
            .clone()
            .or_else(|| env_var_or_none(LOCAL_SETTINGS_PATH_ENV).map(PathBuf::from))
            .or_else(|| self.options.local_settings_path.clone())
    }

    fn resolve_ssm_path(&self) -> Option<String> {
        self.ssm_path
            .clone()
            .or_else(|| env_var_or_none(SSM_SETTINGS_PATH_ENV))
            .or_else(|| self.options.ssm_settings_path.clone())
    }

    fn remote(&self) -> Result<Option<(Map<String, Value>, Arc<Parameter>)>> {
        let Some(path) = self.resolve_ssm_path() else {
            return Ok(None);
        };
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| ConfigError::MissingStore { path: path.clone() })?;
        remote_layer(store, &path, &self.codec)
    }

    /// Collect every layer, highest priority first.
    fn layers(&self) -> Result<(Vec<Map<String, Value>>, Option<Arc<Parameter>>)> {
        let fields = T::fields();
        let prefix = self.options.env_prefix.as_str();
        let case_sensitive = self.options.case_sensitive;

        let mut layers = vec![self.explicit.clone()];

        if let Some(path) = self.resolve_local_path()
            && let Some(layer) = local_layer(&path)?
        {
            layers.push(layer);
        }

        let origin = match self.remote()? {
            Some((layer, parameter)) => {
                layers.push(layer);
                Some(parameter)
            }
            None => None,
        };

        layers.push(env_layer(
            fields,
            prefix,
            self.options.env_file.as_deref(),
            case_sensitive,
        )?);

        if let Some(dir) = &self.options.secrets_dir {
            layers.push(secrets_layer(fields, prefix, dir, case_sensitive)?);
        }

        if !case_sensitive {
            layers = layers
                .into_iter()
                .map(|layer| fold_case(layer, fields))
                .collect();
        }
        Ok((layers, origin))
    }

    /// The merged mapping handed to validation, before the origin key is dropped.
    pub fn merged(&self) -> Result<Map<String, Value>> {
        self.layers().map(|(layers, _)| merge_by_priority(layers))
    }

    /// Resolve, merge and validate.
    pub fn load(self) -> Result<Settings<T>> {
        let (layers, origin) = self.layers()?;
        let layer_count = layers.len();
        let merged = merge_by_priority(layers);
        debug!(
            schema = T::name(),
            layers = layer_count,
            keys = merged.len(),
            "merged settings sources"
        );

        let inner = Settings::<T>::validate(merged)?;
        let mut settings = Settings::new(inner)
            .with_options(self.options)
            .with_codec(self.codec);
        if let Some(store) = self.store {
            settings = settings.with_store(store);
        }
        if let Some(origin) = origin {
            settings = settings.with_origin(origin);
        }
        Ok(settings)
    }
}
