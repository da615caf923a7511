//! Wire models for the parameter store API.
//!
//! Responsibilities:
//! - Mirror the store's PascalCase JSON request/response shapes.
//! - Provide the enums for parameter type, tier and data type.
//!
//! Does NOT handle:
//! - Value escaping or envelope wrapping (see `ssm-config`'s codec).
//! - Transport (see [`crate::store::ParameterStore`] implementations).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::serde_helpers::opt_timestamp_from_epoch_or_string;

/// Parameter value type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    #[default]
    String,
    StringList,
    SecureString,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::StringList => "StringList",
            Self::SecureString => "SecureString",
        }
    }
}

/// Storage tier; governs the maximum value size and cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterTier {
    #[default]
    Standard,
    Advanced,
    #[serde(rename = "Intelligent-Tiering")]
    IntelligentTiering,
}

impl ParameterTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Advanced => "Advanced",
            Self::IntelligentTiering => "Intelligent-Tiering",
        }
    }
}

/// What the store validates the value against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterDataType {
    #[default]
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "aws:ec2:image")]
    Ec2Image,
    #[serde(rename = "aws:ssm:integration")]
    SsmIntegration,
}

impl ParameterDataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ec2Image => "aws:ec2:image",
            Self::SsmIntegration => "aws:ssm:integration",
        }
    }
}

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Descriptive metadata returned by `DescribeParameters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterMetadata {
    pub name: String,
    #[serde(rename = "ARN", default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_timestamp_from_epoch_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default)]
    pub tier: ParameterTier,
    #[serde(default)]
    pub data_type: ParameterDataType,
}

/// A parameter value as returned by `GetParameter` / `GetParametersByPath`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterValue {
    pub name: String,
    #[serde(rename = "Type", default)]
    pub kind: ParameterType,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_timestamp_from_epoch_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(rename = "ARN", default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default)]
    pub data_type: ParameterDataType,
}

/// Name filter for `DescribeParameters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFilter {
    /// Every parameter whose name starts with the given string.
    BeginsWith(String),
    /// The parameter with exactly this name.
    Equals(String),
}

impl NameFilter {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::BeginsWith(prefix) => name.starts_with(prefix.as_str()),
            Self::Equals(exact) => name == exact,
        }
    }

    pub fn option(&self) -> &'static str {
        match self {
            Self::BeginsWith(_) => "BeginsWith",
            Self::Equals(_) => "Equals",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::BeginsWith(v) | Self::Equals(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeParametersRequest {
    pub filter: NameFilter,
    pub next_token: Option<String>,
}

impl DescribeParametersRequest {
    pub fn new(filter: NameFilter) -> Self {
        Self {
            filter,
            next_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetParametersByPathRequest {
    pub path: String,
    pub recursive: bool,
    pub next_token: Option<String>,
}

impl GetParametersByPathRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
            next_token: None,
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// `PutParameter` request body.
///
/// Serializes to the exact JSON accepted by `aws ssm put-parameter --cli-input-json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutParameterRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: String,
    #[serde(rename = "Type", default)]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,
    #[serde(default)]
    pub tier: ParameterTier,
    #[serde(default)]
    pub data_type: ParameterDataType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutParameterResponse {
    pub version: i64,
    #[serde(default)]
    pub tier: ParameterTier,
}
