//! # Check Subcommand
//!
//! Decodes a models file and runs every validator over it.
//!
//! Exit codes: 0 when the schema is clean, 1 when validation found
//! something (the report goes to stdout). Unreadable or undecodable input
//! is an operational error and surfaces as `Err`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use mdv_schema::{ErrorList, Schema};

use crate::config::{CheckConfig, ReportFormat};

/// Schema decoded and clean.
pub const EXIT_OK: u8 = 0;
/// Schema decoded, validation findings reported.
pub const EXIT_FINDINGS: u8 = 1;

/// Arguments for the `mdv check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Models file to check; `-` or nothing reads stdin.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Report format (overrides MDV_REPORT_FORMAT).
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Execute the check subcommand against the process environment.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let config = CheckConfig::from_env()
        .context("invalid configuration")?
        .with_args(args);
    tracing::debug!(?config, "resolved check configuration");

    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    run_with(&config, stdin, &mut stdout)
}

/// Execute a check with explicit input and output streams.
pub fn run_with(config: &CheckConfig, stdin: impl Read, out: &mut impl Write) -> Result<u8> {
    let schema = load_schema(config.models_path.as_deref(), stdin)?;
    tracing::info!(models = schema.len(), "loaded models");

    match mdv_schema::check(&schema) {
        Ok(()) => {
            tracing::info!("models are valid");
            if config.format == ReportFormat::Json {
                write_report(out, &ErrorList::default(), config.format)?;
            }
            Ok(EXIT_OK)
        }
        Err(errors) => {
            tracing::warn!(findings = errors.violations().len(), "models are invalid");
            write_report(out, &errors, config.format)?;
            Ok(EXIT_FINDINGS)
        }
    }
}

fn load_schema(path: Option<&Path>, stdin: impl Read) -> Result<Schema> {
    match path {
        Some(path) if path != Path::new("-") => Schema::from_path(path)
            .with_context(|| format!("failed to load models from {}", path.display())),
        _ => Schema::from_reader(stdin).context("failed to load models from stdin"),
    }
}

fn write_report(out: &mut impl Write, errors: &ErrorList, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Text => writeln!(out, "{errors}")?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, errors)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
