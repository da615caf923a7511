//! In-memory parameter store.
//!
//! Purpose: a faithful, process-local stand-in for the remote store, used by tests and dry runs.
//! Responsibilities: versioning, overwrite semantics, prefix/path listing with pagination, tags,
//! per-operation call counters.
//! Non-scope: value size limits, parameter policies, KMS.
//!
//! Invariants:
//! - Versions start at 1 and increase by one on every overwrite.
//! - Path listing only returns names strictly below the requested path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use tracing::debug;

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::{Result, StoreError};
use crate::models::{
    DescribeParametersRequest, GetParametersByPathRequest, Page, ParameterMetadata, ParameterType,
    ParameterValue, PutParameterRequest, PutParameterResponse, Tag,
};
use crate::store::ParameterStore;

#[derive(Debug, Clone)]
struct StoredParameter {
    metadata: ParameterMetadata,
    value: String,
    tags: Vec<Tag>,
}

impl StoredParameter {
    fn to_value(&self) -> ParameterValue {
        ParameterValue {
            name: self.metadata.name.clone(),
            kind: self.metadata.kind,
            value: self.value.clone(),
            version: self.metadata.version,
            last_modified_date: self.metadata.last_modified_date,
            arn: self.metadata.arn.clone(),
            data_type: self.metadata.data_type,
        }
    }
}

/// Number of calls made to each store operation.
#[derive(Debug, Default)]
pub struct CallCounts {
    describe: AtomicUsize,
    get_by_path: AtomicUsize,
    list_tags: AtomicUsize,
    get: AtomicUsize,
    put: AtomicUsize,
}

impl CallCounts {
    pub fn describe(&self) -> usize {
        self.describe.load(Ordering::SeqCst)
    }

    pub fn get_by_path(&self) -> usize {
        self.get_by_path.load(Ordering::SeqCst)
    }

    pub fn list_tags(&self) -> usize {
        self.list_tags.load(Ordering::SeqCst)
    }

    pub fn get(&self) -> usize {
        self.get.load(Ordering::SeqCst)
    }

    pub fn put(&self) -> usize {
        self.put.load(Ordering::SeqCst)
    }

    /// Sum over all operations.
    pub fn total(&self) -> usize {
        self.describe() + self.get_by_path() + self.list_tags() + self.get() + self.put()
    }
}

/// A thread-safe parameter store living in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    params: RwLock<BTreeMap<String, StoredParameter>>,
    page_size: usize,
    calls: CallCounts,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store whose listings return at most `page_size` items per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            params: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            calls: CallCounts::default(),
        }
    }

    /// Seed a plain `String` parameter without counting it as a call.
    pub fn insert(&self, name: &str, value: &str) {
        self.insert_with(name, value, None, Vec::new());
    }

    /// Seed a parameter with a description and tags without counting it as a call.
    pub fn insert_with(&self, name: &str, value: &str, description: Option<&str>, tags: Vec<Tag>) {
        let mut params = self.params.write().unwrap_or_else(PoisonError::into_inner);
        let version = params
            .get(name)
            .and_then(|p| p.metadata.version)
            .map_or(1, |v| v + 1);
        params.insert(
            name.to_string(),
            StoredParameter {
                metadata: ParameterMetadata {
                    name: name.to_string(),
                    description: description.map(str::to_string),
                    version: Some(version),
                    last_modified_date: Some(Utc::now()),
                    ..Default::default()
                },
                value: value.to_string(),
                tags,
            },
        );
    }

    /// Seed a fully described parameter without counting it as a call.
    pub fn insert_metadata(&self, metadata: ParameterMetadata, value: &str, tags: Vec<Tag>) {
        let mut params = self.params.write().unwrap_or_else(PoisonError::into_inner);
        params.insert(
            metadata.name.clone(),
            StoredParameter {
                metadata,
                value: value.to_string(),
                tags,
            },
        );
    }

    /// The raw stored (wire) value of a parameter.
    pub fn raw_value(&self, name: &str) -> Option<String> {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        params.get(name).map(|p| p.value.clone())
    }

    /// Names of every stored parameter, sorted.
    pub fn names(&self) -> Vec<String> {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        params.keys().cloned().collect()
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    fn paginate<T>(&self, items: Vec<T>, next_token: Option<&str>) -> Result<Page<T>> {
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::Api {
                    code: "InvalidNextToken".to_string(),
                    message: format!("invalid token: {token}"),
                })?,
            None => 0,
        };
        let end = (start + self.page_size).min(items.len());
        let next_token = (end < items.len()).then(|| end.to_string());
        let items = items
            .into_iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();
        Ok(Page { items, next_token })
    }
}

fn under_path(name: &str, path: &str, recursive: bool) -> bool {
    let prefix = if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    };
    match name.strip_prefix(prefix.as_str()) {
        Some(rest) if !rest.is_empty() => recursive || !rest.contains('/'),
        _ => false,
    }
}

impl ParameterStore for MemoryStore {
    fn describe_parameters(
        &self,
        request: &DescribeParametersRequest,
    ) -> Result<Page<ParameterMetadata>> {
        self.calls.describe.fetch_add(1, Ordering::SeqCst);
        let matching: Vec<_> = {
            let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
            params
                .values()
                .filter(|p| request.filter.matches(&p.metadata.name))
                .map(|p| p.metadata.clone())
                .collect()
        };
        self.paginate(matching, request.next_token.as_deref())
    }

    fn get_parameters_by_path(
        &self,
        request: &GetParametersByPathRequest,
    ) -> Result<Page<ParameterValue>> {
        self.calls.get_by_path.fetch_add(1, Ordering::SeqCst);
        let matching: Vec<_> = {
            let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
            params
                .values()
                .filter(|p| under_path(&p.metadata.name, &request.path, request.recursive))
                .map(StoredParameter::to_value)
                .collect()
        };
        self.paginate(matching, request.next_token.as_deref())
    }

    fn list_tags_for_resource(&self, resource_id: &str) -> Result<Vec<Tag>> {
        self.calls.list_tags.fetch_add(1, Ordering::SeqCst);
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        params
            .get(resource_id)
            .map(|p| p.tags.clone())
            .ok_or_else(|| StoreError::NotFound(resource_id.to_string()))
    }

    fn get_parameter(&self, name: &str) -> Result<ParameterValue> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        params
            .get(name)
            .map(StoredParameter::to_value)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn put_parameter(&self, request: &PutParameterRequest) -> Result<PutParameterResponse> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        let mut params = self.params.write().unwrap_or_else(PoisonError::into_inner);
        let existing = params.get(&request.name);
        if existing.is_some() && !request.overwrite {
            return Err(StoreError::Api {
                code: "ParameterAlreadyExists".to_string(),
                message: format!("The parameter already exists: {}", request.name),
            });
        }
        let version = existing
            .and_then(|p| p.metadata.version)
            .map_or(1, |v| v + 1);
        let tags = existing.map(|p| p.tags.clone()).unwrap_or_default();
        let key_id = match request.kind {
            ParameterType::SecureString => request
                .key_id
                .clone()
                .or_else(|| Some("alias/aws/ssm".to_string())),
            _ => None,
        };
        debug!(name = %request.name, version, "memory store put");
        params.insert(
            request.name.clone(),
            StoredParameter {
                metadata: ParameterMetadata {
                    name: request.name.clone(),
                    arn: None,
                    kind: request.kind,
                    key_id,
                    last_modified_date: Some(Utc::now()),
                    last_modified_user: None,
                    description: request.description.clone(),
                    allowed_pattern: request.allowed_pattern.clone(),
                    version: Some(version),
                    tier: request.tier,
                    data_type: request.data_type,
                },
                value: request.value.clone(),
                tags,
            },
        );
        Ok(PutParameterResponse {
            version,
            tier: request.tier,
        })
    }
}
