//! The `ssm-put` command: read input, build the parameter, print or push it.
//!
//! Responsibilities:
//! - Read the input file or stdin.
//! - Build the parameter, either from raw text or from validated settings.
//! - Render the put-parameter request, or send it through a store.
//!
//! Does NOT handle:
//! - Argument parsing (see `args`).
//! - Exit code mapping (see `error`).

use std::io::{Read, Write};

use anyhow::{Context, Result};
use ssm_client::{AwsSdkStore, ParameterStore};
use ssm_config::{Document, ExportFormat, Parameter, SchemaRegistry};
use tracing::{debug, info};

use crate::args::Cli;
use crate::error::CliError;
use crate::formatters::{RenderOptions, render};

fn read_input(cli: &Cli) -> Result<String> {
    if cli.reads_stdin() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(&cli.input)
            .with_context(|| format!("Failed to read input file '{}'", cli.input))
    }
}

/// Parameter built from `text` (the raw input) under `name`.
pub fn build_parameter(
    text: &str,
    name: &str,
    as_config: bool,
    format: ExportFormat,
) -> Result<Parameter> {
    if !as_config {
        return Ok(Parameter::from_logical(name, text));
    }
    let registry = SchemaRegistry::new().register::<Document>();
    let settings = registry.from_text(text).map_err(|e| match e {
        ssm_config::ConfigError::Validation { .. } => anyhow::Error::new(CliError::EmptyConfig),
        other => anyhow::Error::new(other),
    })?;
    debug!(schema = settings.schema_name(), "input validated as settings");
    let parameter = settings
        .to_parameter(format, Some(name), true)
        .context("Failed to export settings")?;
    Ok(parameter)
}

fn write_output(cli: &Cli, text: &str) -> Result<()> {
    match cli.output_path() {
        Some(path) => std::fs::write(&path, text)
            .with_context(|| format!("Failed to write output file '{}'", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")
        }
    }
}

/// Send `parameter` to `store`, returning the new version.
pub fn push(parameter: &mut Parameter, store: &dyn ParameterStore) -> Result<i64> {
    let version = parameter
        .write(store, None)
        .with_context(|| format!("Failed to put parameter '{}'", parameter.name()))?;
    Ok(version)
}

/// Run the command described by `cli`.
pub fn run(cli: &Cli) -> Result<()> {
    let name = cli.full_parameter_name()?;
    let text = read_input(cli)?;
    let mut parameter = build_parameter(&text, &name, cli.as_config, cli.ssm_config_format.into())?;

    if cli.push {
        let store = AwsSdkStore::connect(cli.profile.as_deref(), cli.region.as_deref())
            .context("Failed to set up the AWS client")?;
        let version = push(&mut parameter, &store)?;
        info!(name = %name, version, "pushed parameter");
        return Ok(());
    }

    let options = RenderOptions {
        compact: cli.compact,
        profile: cli.profile.clone(),
        region: cli.region.clone(),
    };
    let rendered = render(&parameter.put_request(None), cli.output_format, &options)?;
    write_output(cli, &rendered)
}
