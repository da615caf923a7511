//! Shared test utilities for ssm-put integration tests.
//!
//! Invariants / Assumptions:
//! - All integration tests using this helper are hermetic by default.

use std::path::Path;

use assert_cmd::Command;

/// Returns a hermetic `ssm-put` command for integration testing.
///
/// It ensures:
/// - `DOTENV_DISABLED=1` is set to prevent local `.env` contamination.
/// - AWS profile and region variables from the host are cleared.
pub fn ssm_put_cmd() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("ssm-put");

    cmd.env("DOTENV_DISABLED", "1");

    cmd.env_remove("AWS_PROFILE")
        .env_remove("AWS_REGION")
        .env_remove("RUST_LOG");

    cmd
}

/// Points the AWS SDK at `endpoint` with static credentials and no host config.
///
/// `scratch` must be a directory the test owns; the config file paths inside it
/// do not exist.
#[allow(dead_code)]
pub fn with_aws_endpoint(cmd: &mut Command, endpoint: &str, scratch: &Path) {
    cmd.env("AWS_ENDPOINT_URL", endpoint)
        .env("AWS_ACCESS_KEY_ID", "AKIDTEST")
        .env("AWS_SECRET_ACCESS_KEY", "secret")
        .env_remove("AWS_SESSION_TOKEN")
        .env("AWS_CONFIG_FILE", scratch.join("aws-config"))
        .env("AWS_SHARED_CREDENTIALS_FILE", scratch.join("aws-credentials"))
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("AWS_MAX_ATTEMPTS", "1")
        .args(["--region", "us-east-1"]);
}
