//! Output renderers for command results.

use anyhow::anyhow;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};
use crate::dispatch::CommandOutput;

/// Print the command result. Table output is carried by the log lines the
/// session already emitted, so only JSON writes to stdout.
pub(crate) fn render(output: &CommandOutput, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(output)?),
        OutputFormat::Table => {}
    }
    Ok(())
}

fn to_json(output: &CommandOutput) -> CliResult<String> {
    serde_json::to_string_pretty(output)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}
