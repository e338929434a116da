pub mod cli;
pub mod toml_config;

use crate::core::{ConfigProvider, QuotePolicy, UnknownFieldPolicy};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.pipelinedeals.com/api/v3";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "pipedeals-export")]
#[command(about = "Export PipelineDeals companies, users and deals to CSV")]
pub struct CliConfig {
    /// API base URL, up to and including the version segment
    #[arg(long, env = "PIPELINEDEALS_URI", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = "PIPELINEDEALS_TOKEN", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, default_value = ".")]
    pub output_path: String,

    /// Columns to drop from every export
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Drop custom fields without a label instead of failing the run
    #[arg(long)]
    pub skip_unknown_fields: bool,

    /// Write embedded double quotes as single quotes
    #[arg(long)]
    pub fold_quotes: bool,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn excluded_keys(&self) -> HashSet<String> {
        self.exclude.iter().cloned().collect()
    }

    fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        if self.skip_unknown_fields {
            UnknownFieldPolicy::Skip
        } else {
            UnknownFieldPolicy::Fail
        }
    }

    fn quote_policy(&self) -> QuotePolicy {
        if self.fold_quotes {
            QuotePolicy::Fold
        } else {
            QuotePolicy::Escape
        }
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Checks shared by every configuration source.
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    validation::validate_url("base_url", config.base_url())?;
    validation::validate_non_empty_string("api_key", config.api_key())?;
    validation::validate_path("output_path", config.output_path())?;
    if let Some(timeout) = config.request_timeout() {
        validation::validate_positive_number("timeout_seconds", timeout.as_secs(), 1)?;
    }
    Ok(())
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}
