//! Parameter store backed by the AWS SDK for Systems Manager.
//!
//! Responsibilities:
//! - Translate each store operation into one SDK call, driven to completion on an owned runtime.
//! - Convert SDK shapes into the crate's wire models.
//! - Map typed SDK errors onto [`StoreError`].
//!
//! Does NOT handle:
//! - Credentials, signing, retries: the SDK's default chain owns all of that.
//!
//! Invariants:
//! - Reads always ask for decrypted values.
//! - A missing parameter (or tagged resource) is reported as [`StoreError::NotFound`].
//! - Calls must not be made from inside another async runtime.

use aws_sdk_ssm::Client;
use aws_sdk_ssm::config::{BehaviorVersion, Region};
use aws_sdk_ssm::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use aws_sdk_ssm::operation::list_tags_for_resource::ListTagsForResourceError;
use aws_sdk_ssm::types as sdk;
use chrono::{DateTime, Utc};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{Result, StoreError};
use crate::models::{
    DescribeParametersRequest, GetParametersByPathRequest, Page, ParameterDataType,
    ParameterMetadata, ParameterTier, ParameterType, ParameterValue, PutParameterRequest,
    PutParameterResponse, Tag,
};
use crate::store::ParameterStore;

/// A [`ParameterStore`] that talks to AWS Systems Manager through `aws-sdk-ssm`.
pub struct AwsSdkStore {
    client: Client,
    runtime: Runtime,
    page_size: i32,
}

impl std::fmt::Debug for AwsSdkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSdkStore")
            .field("region", &self.client.config().region())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

impl AwsSdkStore {
    /// Load the shared AWS configuration (env, profile files, instance metadata)
    /// and build a store from it.
    pub fn connect(profile: Option<&str>, region: Option<&str>) -> Result<Self> {
        let runtime = build_runtime()?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared = runtime.block_on(loader.load());
        debug!(region = ?shared.region(), profile, "loaded AWS configuration");
        Ok(Self::with_runtime(Client::new(&shared), runtime))
    }

    /// Build a store from an explicit client configuration.
    pub fn from_conf(conf: aws_sdk_ssm::Config) -> Result<Self> {
        Ok(Self::with_runtime(Client::from_conf(conf), build_runtime()?))
    }

    fn with_runtime(client: Client, runtime: Runtime) -> Self {
        Self {
            client,
            runtime,
            page_size: DEFAULT_PAGE_SIZE as i32,
        }
    }

    /// Items requested per listing call, clamped to what every listing accepts.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE) as i32;
        self
    }
}

/// Map an SDK failure: service errors keep their code, `not_found` picks the
/// variants that mean the target is missing, everything else is transport.
fn classify<E, R>(err: SdkError<E, R>, subject: &str, not_found: fn(&E) -> bool) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(service) if not_found(service) => StoreError::NotFound(subject.to_string()),
        Some(service) => StoreError::Api {
            code: service.code().unwrap_or("Unknown").to_string(),
            message: service.message().unwrap_or_default().to_string(),
        },
        None => StoreError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

fn never<E>(_: &E) -> bool {
    false
}

fn request_error(err: BuildError) -> StoreError {
    StoreError::Transport(format!("invalid request: {err}"))
}

fn timestamp(value: Option<&aws_sdk_ssm::primitives::DateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn parameter_type(kind: Option<&sdk::ParameterType>) -> ParameterType {
    match kind {
        Some(sdk::ParameterType::SecureString) => ParameterType::SecureString,
        Some(sdk::ParameterType::StringList) => ParameterType::StringList,
        _ => ParameterType::String,
    }
}

fn tier(tier: Option<&sdk::ParameterTier>) -> ParameterTier {
    match tier {
        Some(sdk::ParameterTier::Advanced) => ParameterTier::Advanced,
        Some(sdk::ParameterTier::IntelligentTiering) => ParameterTier::IntelligentTiering,
        _ => ParameterTier::Standard,
    }
}

fn data_type(raw: Option<&str>) -> ParameterDataType {
    match raw {
        Some("aws:ec2:image") => ParameterDataType::Ec2Image,
        Some("aws:ssm:integration") => ParameterDataType::SsmIntegration,
        _ => ParameterDataType::Text,
    }
}

fn metadata(m: &sdk::ParameterMetadata) -> ParameterMetadata {
    ParameterMetadata {
        name: m.name().unwrap_or_default().to_string(),
        arn: m.arn().map(str::to_string),
        kind: parameter_type(m.r#type()),
        key_id: m.key_id().map(str::to_string),
        last_modified_date: timestamp(m.last_modified_date()),
        last_modified_user: m.last_modified_user().map(str::to_string),
        description: m.description().map(str::to_string),
        allowed_pattern: m.allowed_pattern().map(str::to_string),
        version: Some(m.version()),
        tier: tier(m.tier()),
        data_type: data_type(m.data_type()),
    }
}

fn value(p: &sdk::Parameter) -> ParameterValue {
    ParameterValue {
        name: p.name().unwrap_or_default().to_string(),
        kind: parameter_type(p.r#type()),
        value: p.value().unwrap_or_default().to_string(),
        version: Some(p.version()),
        last_modified_date: timestamp(p.last_modified_date()),
        arn: p.arn().map(str::to_string),
        data_type: data_type(p.data_type()),
    }
}

impl ParameterStore for AwsSdkStore {
    fn describe_parameters(
        &self,
        request: &DescribeParametersRequest,
    ) -> Result<Page<ParameterMetadata>> {
        let filter = sdk::ParameterStringFilter::builder()
            .key("Name")
            .option(request.filter.option())
            .values(request.filter.value())
            .build()
            .map_err(request_error)?;
        debug!(filter = request.filter.value(), "describe_parameters");
        let output = self
            .runtime
            .block_on(
                self.client
                    .describe_parameters()
                    .parameter_filters(filter)
                    .max_results(self.page_size)
                    .set_next_token(request.next_token.clone())
                    .send(),
            )
            .map_err(|e| classify(e, request.filter.value(), never))?;
        Ok(Page {
            items: output.parameters().iter().map(metadata).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    fn get_parameters_by_path(
        &self,
        request: &GetParametersByPathRequest,
    ) -> Result<Page<ParameterValue>> {
        debug!(path = %request.path, recursive = request.recursive, "get_parameters_by_path");
        let output = self
            .runtime
            .block_on(
                self.client
                    .get_parameters_by_path()
                    .path(&request.path)
                    .recursive(request.recursive)
                    .with_decryption(true)
                    .max_results(self.page_size)
                    .set_next_token(request.next_token.clone())
                    .send(),
            )
            .map_err(|e| classify(e, &request.path, never))?;
        Ok(Page {
            items: output.parameters().iter().map(value).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    fn list_tags_for_resource(&self, resource_id: &str) -> Result<Vec<Tag>> {
        debug!(resource_id, "list_tags_for_resource");
        let output = self
            .runtime
            .block_on(
                self.client
                    .list_tags_for_resource()
                    .resource_type(sdk::ResourceTypeForTagging::Parameter)
                    .resource_id(resource_id)
                    .send(),
            )
            .map_err(|e| {
                classify(e, resource_id, ListTagsForResourceError::is_invalid_resource_id)
            })?;
        Ok(output
            .tag_list()
            .iter()
            .map(|t| Tag::new(t.key(), t.value()))
            .collect())
    }

    fn get_parameter(&self, name: &str) -> Result<ParameterValue> {
        debug!(name, "get_parameter");
        let output = self
            .runtime
            .block_on(
                self.client
                    .get_parameter()
                    .name(name)
                    .with_decryption(true)
                    .send(),
            )
            .map_err(|e| classify(e, name, GetParameterError::is_parameter_not_found))?;
        output
            .parameter()
            .map(value)
            .ok_or_else(|| StoreError::InvalidResponse(format!("get_parameter {name}: no parameter")))
    }

    fn put_parameter(&self, request: &PutParameterRequest) -> Result<PutParameterResponse> {
        debug!(name = %request.name, overwrite = request.overwrite, "put_parameter");
        let output = self
            .runtime
            .block_on(
                self.client
                    .put_parameter()
                    .name(&request.name)
                    .value(&request.value)
                    .r#type(sdk::ParameterType::from(request.kind.as_str()))
                    .overwrite(request.overwrite)
                    .tier(sdk::ParameterTier::from(request.tier.as_str()))
                    .data_type(request.data_type.as_str())
                    .set_description(request.description.clone())
                    .set_key_id(request.key_id.clone())
                    .set_allowed_pattern(request.allowed_pattern.clone())
                    .send(),
            )
            .map_err(|e| classify(e, &request.name, never))?;
        Ok(PutParameterResponse {
            version: output.version(),
            tier: tier(output.tier()),
        })
    }
}
