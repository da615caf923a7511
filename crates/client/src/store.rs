//! The parameter store seam.
//!
//! Responsibilities:
//! - Define the five remote operations the configuration layer relies on.
//! - Provide helpers that drain paginated operations.
//!
//! Does NOT handle:
//! - Retries or backoff; implementations (or whatever they drive) own that.
//!
//! Invariants:
//! - Implementations report a missing parameter as [`StoreError::NotFound`](crate::StoreError::NotFound).
//! - Every call is blocking and runs to completion.

use tracing::trace;

use crate::error::Result;
use crate::models::{
    DescribeParametersRequest, GetParametersByPathRequest, NameFilter, Page, ParameterMetadata,
    ParameterValue, PutParameterRequest, PutParameterResponse, Tag,
};

/// A remote hierarchical parameter store.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait ParameterStore: Send + Sync {
    /// One page of descriptive metadata for parameters matching a name filter.
    fn describe_parameters(
        &self,
        request: &DescribeParametersRequest,
    ) -> Result<Page<ParameterMetadata>>;

    /// One page of values for every parameter under a path.
    fn get_parameters_by_path(
        &self,
        request: &GetParametersByPathRequest,
    ) -> Result<Page<ParameterValue>>;

    /// Tags attached to a parameter.
    fn list_tags_for_resource(&self, resource_id: &str) -> Result<Vec<Tag>>;

    /// The value of exactly one parameter.
    fn get_parameter(&self, name: &str) -> Result<ParameterValue>;

    /// Create or overwrite a parameter.
    fn put_parameter(&self, request: &PutParameterRequest) -> Result<PutParameterResponse>;
}

/// Describe every parameter matching `filter`, following pagination to the end.
pub fn describe_all(
    store: &dyn ParameterStore,
    filter: NameFilter,
) -> Result<Vec<ParameterMetadata>> {
    let mut request = DescribeParametersRequest::new(filter);
    let mut out = Vec::new();
    loop {
        let page = store.describe_parameters(&request)?;
        trace!(count = page.items.len(), "describe_parameters page");
        out.extend(page.items);
        match page.next_token {
            Some(token) => request.next_token = Some(token),
            None => return Ok(out),
        }
    }
}

/// Fetch every value under `path` (recursively), following pagination to the end.
pub fn get_all_by_path(store: &dyn ParameterStore, path: &str) -> Result<Vec<ParameterValue>> {
    let mut request = GetParametersByPathRequest::new(path);
    let mut out = Vec::new();
    loop {
        let page = store.get_parameters_by_path(&request)?;
        trace!(count = page.items.len(), "get_parameters_by_path page");
        out.extend(page.items);
        match page.next_token {
            Some(token) => request.next_token = Some(token),
            None => return Ok(out),
        }
    }
}
