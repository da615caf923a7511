//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Derive the full parameter name from the arguments.
//!
//! Non-responsibilities:
//! - Does not read input or talk to the store (see `put` module).

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use ssm_config::ExportFormat;

use crate::error::CliError;

/// Marker used for stdin input and stdout output.
pub const DASH: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "ssm-put")]
#[command(
    about = "Turn a file into an SSM put-parameter request, shell command or direct write",
    long_about = None
)]
#[command(version)]
#[command(
    after_help = "Examples:\n  ssm-put settings.yaml --parameter-base-name /app/prod/\n  ssm-put settings.yaml --as-config --ssm-config-format json --output-format shell\n  cat notes.txt | ssm-put - --parameter-name /app/notes --push --profile prod\n"
)]
pub struct Cli {
    /// File to upload, or `-` for stdin
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Where to write the request, or `-` for stdout
    #[arg(value_name = "OUTPUT", default_value = DASH)]
    pub output: String,

    /// Parameter name (defaults to the input file's name)
    #[arg(long)]
    pub parameter_name: Option<String>,

    /// Prefix prepended to the parameter name
    #[arg(long, default_value = "")]
    pub parameter_base_name: String,

    /// Validate the input as settings and re-export it
    #[arg(long)]
    pub as_config: bool,

    /// Format of the stored settings when --as-config is used
    #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
    pub ssm_config_format: ConfigFormat,

    /// Shape of the printed request
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output_format: OutputFormat,

    /// Print JSON on a single line
    #[arg(long)]
    pub compact: bool,

    /// Send the request to AWS Systems Manager instead of printing it
    #[arg(long, alias = "push-to-aws")]
    pub push: bool,

    /// AWS profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl From<ConfigFormat> for ExportFormat {
    fn from(format: ConfigFormat) -> Self {
        match format {
            ConfigFormat::Json => ExportFormat::Json,
            ConfigFormat::Yaml => ExportFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The put-parameter request JSON
    Json,
    /// A heredoc plus `aws ssm put-parameter` command
    Shell,
}

impl Cli {
    pub fn reads_stdin(&self) -> bool {
        self.input == DASH
    }

    pub fn writes_stdout(&self) -> bool {
        self.output == DASH
    }

    /// Output file, unless writing to stdout.
    pub fn output_path(&self) -> Option<PathBuf> {
        (!self.writes_stdout()).then(|| PathBuf::from(&self.output))
    }

    /// `--parameter-base-name` followed by the explicit or derived name.
    pub fn full_parameter_name(&self) -> Result<String, CliError> {
        let name = match &self.parameter_name {
            Some(name) => name.clone(),
            None if self.reads_stdin() => return Err(CliError::MissingParameterName),
            None => Path::new(&self.input)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| CliError::InvalidInputPath(self.input.clone()))?,
        };
        Ok(format!("{}{}", self.parameter_base_name, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ssm-put").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_name_defaults_to_file_name() {
        let cli = parse(&["conf/settings.yaml", "--parameter-base-name", "/app/"]);
        assert_eq!(cli.full_parameter_name().unwrap(), "/app/settings.yaml");
        assert!(cli.writes_stdout());
    }

    #[test]
    fn test_explicit_name_wins() {
        let cli = parse(&["settings.yaml", "--parameter-name", "/x/y"]);
        assert_eq!(cli.full_parameter_name().unwrap(), "/x/y");
    }

    #[test]
    fn test_stdin_requires_name() {
        let cli = parse(&["-"]);
        assert!(matches!(
            cli.full_parameter_name(),
            Err(CliError::MissingParameterName)
        ));
    }

    #[test]
    fn test_formats_parse() {
        let cli = parse(&[
            "in.yaml",
            "out.json",
            "--ssm-config-format",
            "json",
            "--output-format",
            "shell",
            "--compact",
        ]);
        assert_eq!(cli.ssm_config_format, ConfigFormat::Json);
        assert_eq!(cli.output_format, OutputFormat::Shell);
        assert_eq!(cli.output_path(), Some(PathBuf::from("out.json")));
        assert!(cli.compact);
    }

    #[test]
    fn test_unknown_config_format_is_rejected() {
        let result = Cli::try_parse_from(["ssm-put", "in.yaml", "--ssm-config-format", "env"]);
        assert!(result.is_err());
    }
}
