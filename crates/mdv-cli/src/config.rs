//! Check configuration.
//!
//! Defaults come from environment variables; command-line flags override
//! them.

use std::path::PathBuf;
use std::str::FromStr;

use crate::check::CheckArgs;

/// Environment variable naming the default models file.
pub const MODELS_PATH_VAR: &str = "MDV_MODELS_PATH";
/// Environment variable selecting the report format.
pub const REPORT_FORMAT_VAR: &str = "MDV_REPORT_FORMAT";

/// How findings are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Indented, grouped list.
    #[default]
    Text,
    /// The report tree as JSON.
    Json,
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

/// Settings for one `mdv check` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckConfig {
    /// Models file to read. `None` or `-` reads stdin.
    pub models_path: Option<PathBuf>,
    pub format: ReportFormat,
}

impl CheckConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MDV_MODELS_PATH` (default: read stdin)
    /// - `MDV_REPORT_FORMAT`: `text` or `json` (default: `text`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let models_path = lookup(MODELS_PATH_VAR)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let format = match lookup(REPORT_FORMAT_VAR).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => ReportFormat::default(),
        };
        Ok(Self {
            models_path,
            format,
        })
    }

    /// Apply command-line overrides.
    pub fn with_args(mut self, args: &CheckArgs) -> Self {
        if let Some(path) = &args.path {
            self.models_path = Some(path.clone());
        }
        if let Some(format) = args.format {
            self.format = format;
        }
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid MDV_REPORT_FORMAT value `{0}`, expected `text` or `json`")]
    InvalidFormat(String),
}
