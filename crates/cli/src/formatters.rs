//! Rendering of put-parameter requests for stdout or a file.
//!
//! Responsibilities:
//! - Print the request JSON, pretty or compact.
//! - Wrap it in a heredoc plus the matching `aws ssm put-parameter` command.
//!
//! Invariants:
//! - The heredoc is quoted, so the JSON is never expanded by the shell.

use anyhow::Result;
use ssm_client::PutParameterRequest;
use ssm_config::shell_quote;
use uuid::Uuid;

use crate::args::OutputFormat;

/// Options that shape the rendered command.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub compact: bool,
    pub profile: Option<String>,
    pub region: Option<String>,
}

/// Random shell variable name for the heredoc.
fn heredoc_variable() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("SSM_PARAMETER_{}", id[..12].to_uppercase())
}

fn request_json(request: &PutParameterRequest, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(request)?
    } else {
        serde_json::to_string_pretty(request)?
    };
    Ok(json)
}

/// Render `request` in the requested shape.
pub fn render(
    request: &PutParameterRequest,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<String> {
    let json = request_json(request, options.compact)?;
    match format {
        OutputFormat::Json => Ok(format!("{json}\n")),
        OutputFormat::Shell => Ok(render_shell(&json, &heredoc_variable(), options)),
    }
}

fn render_shell(json: &str, var: &str, options: &RenderOptions) -> String {
    let mut out = format!("read -r -d '' {var} <<'EOF_{var}'\n{json}\nEOF_{var}\n\n");
    out.push_str(&format!("aws ssm put-parameter --cli-input-json \"${var}\""));
    if let Some(profile) = &options.profile {
        out.push_str(&format!(" --profile {}", shell_quote(profile)));
    }
    if let Some(region) = &options.region {
        out.push_str(&format!(" --region {}", shell_quote(region)));
    }
    out.push('\n');
    out
}
