//! A single remote parameter: value plus metadata.
//!
//! Responsibilities:
//! - Fetch one parameter (value, description metadata, tags) and merge the results.
//! - Decode the stored value through the value codec, once.
//! - Build and send put requests for new or updated values.
//!
//! Does NOT handle:
//! - Listing or hierarchy (see `tree.rs`).
//!
//! Invariants:
//! - `value` holds the stored text with escaping already reversed.
//! - A parameter the store does not know is `value == ""`, never an error.
//! - Tags are fetched at most once per instance.

use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use ssm_client::{
    NameFilter, ParameterDataType, ParameterMetadata, ParameterStore, ParameterTier,
    ParameterType, ParameterValue, PutParameterRequest, Tag, describe_all,
};
use tracing::{debug, info};

use crate::codec::{ValueCodec, unescape};
use crate::error::Result;
use crate::lazy_dict;
use crate::path::ParameterPath;

/// Field names a parameter exposes to path navigation.
pub const PARAMETER_FIELDS: &[&str] = &[
    "name",
    "description",
    "value",
    "type",
    "key_id",
    "allowed_pattern",
    "version",
    "last_modified_date",
    "tier",
    "data_type",
];

/// A parameter with its metadata.
pub struct Parameter {
    path: ParameterPath,
    value: String,
    pub description: Option<String>,
    pub kind: ParameterType,
    pub key_id: Option<String>,
    pub allowed_pattern: Option<String>,
    pub version: Option<i64>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub tier: ParameterTier,
    pub data_type: ParameterDataType,
    codec: ValueCodec,
    decoded: OnceLock<String>,
    tags: Mutex<Option<Vec<Tag>>>,
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.path.as_str())
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("tier", &self.tier)
            .field("value_len", &self.value.len())
            .finish_non_exhaustive()
    }
}

impl Clone for Parameter {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            value: self.value.clone(),
            description: self.description.clone(),
            kind: self.kind,
            key_id: self.key_id.clone(),
            allowed_pattern: self.allowed_pattern.clone(),
            version: self.version,
            last_modified_date: self.last_modified_date,
            tier: self.tier,
            data_type: self.data_type,
            codec: self.codec.clone(),
            decoded: self.decoded.clone(),
            tags: Mutex::new(self.cached_tags()),
        }
    }
}

impl Parameter {
    /// A parameter that exists only locally, holding `value` as its (unescaped) stored text.
    pub fn new(name: impl Into<ParameterPath>, value: impl Into<String>) -> Self {
        Self {
            path: name.into(),
            value: value.into(),
            description: None,
            kind: ParameterType::default(),
            key_id: None,
            allowed_pattern: None,
            version: None,
            last_modified_date: None,
            tier: ParameterTier::default(),
            data_type: ParameterDataType::default(),
            codec: ValueCodec::default(),
            decoded: OnceLock::new(),
            tags: Mutex::new(None),
        }
    }

    /// A local parameter whose logical (decoded) value is `text`.
    pub fn from_logical(name: impl Into<ParameterPath>, text: &str) -> Self {
        Self::from_logical_with_codec(name, text, ValueCodec::default())
    }

    pub fn from_logical_with_codec(
        name: impl Into<ParameterPath>,
        text: &str,
        codec: ValueCodec,
    ) -> Self {
        let mut param = Self::new(name, "").with_codec(codec);
        param.set_logical_value(text);
        param
    }

    /// Build from described metadata and, if listed, the value the store returned.
    pub fn from_metadata(metadata: ParameterMetadata, value: Option<&ParameterValue>) -> Self {
        let mut param = Self::new(metadata.name.as_str(), "");
        param.apply_metadata(metadata);
        if let Some(value) = value {
            param.apply_value(value);
        }
        param
    }

    /// Build from a listed value alone (no description metadata was returned).
    pub fn from_value(value: &ParameterValue) -> Self {
        let mut param = Self::new(value.name.as_str(), "");
        param.apply_value(value);
        param
    }

    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self.decoded = OnceLock::new();
        self
    }

    /// Fetch `name` from the store.
    ///
    /// Issues one get, one describe and one tag listing. A missing parameter
    /// yields `Parameter::new(name, default_value)`.
    pub fn fetch(store: &dyn ParameterStore, name: &str, default_value: &str) -> Result<Self> {
        let path = ParameterPath::new(name);
        let value = match store.get_parameter(path.as_str()) {
            Ok(value) => value,
            Err(e) if e.is_not_found() => {
                debug!(name = %path, "parameter not found, using default");
                return Ok(Self::new(path, default_value));
            }
            Err(e) => return Err(e.into()),
        };
        let described = describe_all(store, NameFilter::Equals(path.as_str().to_string()))?;
        let Some(metadata) = described.into_iter().find(|m| m.name == path.as_str()) else {
            debug!(name = %path, "parameter vanished between get and describe");
            return Ok(Self::new(path, default_value));
        };
        let param = Self::from_metadata(metadata, Some(&value));
        param.ensure_tags_fetched(store)?;
        debug!(name = %path, version = ?param.version, "fetched parameter");
        Ok(param)
    }

    fn apply_metadata(&mut self, metadata: ParameterMetadata) {
        self.path = ParameterPath::new(&metadata.name);
        self.description = metadata.description;
        self.kind = metadata.kind;
        self.key_id = metadata.key_id;
        self.allowed_pattern = metadata.allowed_pattern;
        self.version = metadata.version;
        self.last_modified_date = metadata.last_modified_date;
        self.tier = metadata.tier;
        self.data_type = metadata.data_type;
    }

    fn apply_value(&mut self, value: &ParameterValue) {
        self.set_value(unescape(&value.value));
        self.kind = value.kind;
        self.data_type = value.data_type;
        self.version = value.version.or(self.version);
        self.last_modified_date = value.last_modified_date.or(self.last_modified_date);
    }

    pub fn path(&self) -> &ParameterPath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.as_str()
    }

    /// The stored value with escaping reversed (may still be a sealed envelope).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the stored value; the decoded cache is reset.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.decoded = OnceLock::new();
    }

    /// Replace the value with the stored form of logical `text`.
    pub fn set_logical_value(&mut self, text: &str) {
        let stored = unescape(&self.codec.encode_for_wire(text));
        self.set_value(stored);
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// The logical value, computed on first use.
    pub fn decoded_value(&self) -> &str {
        self.decoded
            .get_or_init(|| self.codec.decode_unescaped(&self.value))
    }

    /// The decoded value parsed as a mapping (empty if it is not structured).
    pub fn lazy_dict(&self) -> Map<String, Value> {
        lazy_dict::parse(self.decoded_value())
    }

    fn cached_tags(&self) -> Option<Vec<Tag>> {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tags, fetched from the store on first call and cached afterwards.
    pub fn tags(&self, store: &dyn ParameterStore) -> Result<Vec<Tag>> {
        self.ensure_tags_fetched(store)?;
        Ok(self.cached_tags().unwrap_or_default())
    }

    /// Fetch tags if they have not been fetched yet.
    pub fn ensure_tags_fetched(&self, store: &dyn ParameterStore) -> Result<()> {
        let mut tags = self.tags.lock().unwrap_or_else(PoisonError::into_inner);
        if tags.is_some() {
            return Ok(());
        }
        let fetched = match store.list_tags_for_resource(self.name()) {
            Ok(fetched) => fetched,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        *tags = Some(fetched);
        Ok(())
    }

    /// Whether tags have been fetched (or set locally).
    pub fn tags_fetched(&self) -> bool {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Set tags locally; no store call is made and they are not written by [`Parameter::write`].
    pub fn set_tags(&self, new_tags: Vec<Tag>) {
        *self.tags.lock().unwrap_or_else(PoisonError::into_inner) = Some(new_tags);
    }

    /// The request [`Parameter::write`] would send.
    ///
    /// `new_value` is logical text; `None` re-sends the current decoded value.
    pub fn put_request(&self, new_value: Option<&str>) -> PutParameterRequest {
        let logical = new_value.unwrap_or_else(|| self.decoded_value());
        PutParameterRequest {
            name: self.name().to_string(),
            description: self.description.clone(),
            value: self.codec.encode_for_wire(logical),
            kind: self.kind,
            key_id: self.key_id.clone(),
            overwrite: true,
            allowed_pattern: self.allowed_pattern.clone(),
            tier: self.tier,
            data_type: self.data_type,
        }
    }

    /// Write `new_value` (or the current value) to the store, returning the new version.
    pub fn write(&mut self, store: &dyn ParameterStore, new_value: Option<&str>) -> Result<i64> {
        let request = self.put_request(new_value);
        let response = store.put_parameter(&request)?;
        info!(name = %self.path, version = response.version, "wrote parameter");
        self.set_value(unescape(&request.value));
        self.version = Some(response.version);
        self.tier = response.tier;
        Ok(response.version)
    }

    /// Look up a navigable field by name.
    pub fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "name" => Value::String(self.name().to_string()),
            "description" => opt_string(self.description.as_deref()),
            "value" => Value::String(self.value.clone()),
            "type" => Value::String(self.kind.as_str().to_string()),
            "key_id" => opt_string(self.key_id.as_deref()),
            "allowed_pattern" => opt_string(self.allowed_pattern.as_deref()),
            "version" => self.version.map_or(Value::Null, Value::from),
            "last_modified_date" => self.last_modified_date.map_or(Value::Null, |d| {
                Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }),
            "tier" => Value::String(self.tier.as_str().to_string()),
            "data_type" => Value::String(self.data_type.as_str().to_string()),
            _ => return None,
        };
        Some(value)
    }
}

fn opt_string(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}
