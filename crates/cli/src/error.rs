//! CLI errors and exit codes for scripting and automation.
//!
//! Responsibilities:
//! - Define structured exit codes that scripts can use to distinguish error types.
//! - Map store and configuration errors to exit codes.
//!
//! Does NOT handle:
//! - Error message formatting (handled by anyhow Display).
//!
//! Invariants:
//! - Exit code 2 is shared with clap's own usage errors.

use ssm_client::StoreError;
use ssm_config::ConfigError;
use thiserror::Error;

/// Usage problems detected after argument parsing.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("--parameter-name is required when reading from stdin")]
    MissingParameterName,

    #[error("Cannot derive a parameter name from input path '{0}'")]
    InvalidInputPath(String),

    #[error("Input did not contain any settings")]
    EmptyConfig,
}

/// Structured exit codes for ssm-put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success - command completed successfully.
    Success = 0,

    /// General error - unhandled or generic failure.
    GeneralError = 1,

    /// Usage error - missing or contradictory arguments.
    UsageError = 2,

    /// Store error - the request could not reach the store or the store rejected it.
    ///
    /// Scripts may retry.
    StoreError = 3,

    /// Parameter not found.
    NotFound = 4,

    /// Validation error - input is not valid settings or uses an unsupported format.
    ///
    /// Scripts should fix the input and not retry.
    ValidationError = 5,
}

impl ExitCode {
    /// Convert the exit code to an i32 for use with std::process::exit().
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

impl From<&StoreError> for ExitCode {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ExitCode::NotFound,
            StoreError::Api { .. }
            | StoreError::Transport(_)
            | StoreError::Io(_)
            | StoreError::InvalidResponse(_) => ExitCode::StoreError,
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::Store(inner) => Self::from(inner),
            ConfigError::Validation { .. }
            | ConfigError::UnsupportedFormat(_)
            | ConfigError::Serialization(_)
            | ConfigError::DotenvParse { .. } => ExitCode::ValidationError,
            ConfigError::NoDestination | ConfigError::MissingStore { .. } => ExitCode::UsageError,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::MissingParameterName | CliError::InvalidInputPath(_) => ExitCode::UsageError,
            CliError::EmptyConfig => ExitCode::ValidationError,
        }
    }
}

/// Extension trait for anyhow::Error to extract exit codes.
pub trait ExitCodeExt {
    /// Extract the appropriate exit code from this error.
    ///
    /// Returns ExitCode::GeneralError if no known error is in the chain.
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeExt for anyhow::Error {
    fn exit_code(&self) -> ExitCode {
        for cause in self.chain() {
            if let Some(err) = cause.downcast_ref::<CliError>() {
                return ExitCode::from(err);
            }
            if let Some(err) = cause.downcast_ref::<ConfigError>() {
                return ExitCode::from(err);
            }
            if let Some(err) = cause.downcast_ref::<StoreError>() {
                return ExitCode::from(err);
            }
        }
        ExitCode::GeneralError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_as_i32() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::StoreError.as_i32(), 3);
        assert_eq!(ExitCode::NotFound.as_i32(), 4);
        assert_eq!(ExitCode::ValidationError.as_i32(), 5);
    }

    #[test]
    fn test_store_errors() {
        let err = StoreError::NotFound("/x".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::NotFound);
        let err = StoreError::Api {
            code: "ThrottlingException".to_string(),
            message: "slow down".to_string(),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::StoreError);
    }

    #[test]
    fn test_config_errors() {
        let err = ConfigError::UnsupportedFormat("toml".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::ValidationError);
        let err = ConfigError::Store(StoreError::NotFound("/x".to_string()));
        assert_eq!(ExitCode::from(&err), ExitCode::NotFound);
    }

    #[test]
    fn test_exit_code_found_through_context() {
        let result: Result<(), CliError> = Err(CliError::MissingParameterName);
        let err = result.context("Failed to resolve parameter name").unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::UsageError);

        let err = anyhow::anyhow!("something else");
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
    }
}
