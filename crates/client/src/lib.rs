//! Client for a remote hierarchical parameter store.
//!
//! This crate defines the [`ParameterStore`] seam (describe, list by path,
//! list tags, get, put), the wire models those calls exchange, an
//! [`AwsSdkStore`] backed by `aws-sdk-ssm`, and an
//! in-process [`MemoryStore`] for tests and dry runs.

pub mod aws_sdk;
pub mod constants;
pub mod error;
pub mod memory;
pub mod models;
mod serde_helpers;
pub mod store;

pub use aws_sdk::AwsSdkStore;
pub use error::{Result, StoreError};
pub use memory::{CallCounts, MemoryStore};
pub use models::{
    DescribeParametersRequest, GetParametersByPathRequest, NameFilter, Page, ParameterDataType,
    ParameterMetadata, ParameterTier, ParameterType, ParameterValue, PutParameterRequest,
    PutParameterResponse, Tag,
};
#[cfg(any(test, feature = "test-utils"))]
pub use store::MockParameterStore;
pub use store::{ParameterStore, describe_all, get_all_by_path};
