use crate::config::{validate_provider, DEFAULT_BASE_URL};
use crate::core::{ConfigProvider, EntityKind, QuotePolicy, UnknownFieldPolicy};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::Validate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Collections to export; all three when absent.
    pub collections: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub on_unknown_field: UnknownFieldSetting,
    #[serde(default)]
    pub quotes: QuoteSetting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldSetting {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSetting {
    #[default]
    Escape,
    Fold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_path() -> String {
    ".".to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| ExportError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left
    /// as written so validation reports them.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// The collections to export, in configured order.
    pub fn collections(&self) -> Result<Vec<EntityKind>> {
        let Some(names) = &self.export.collections else {
            return Ok(EntityKind::EXPORTED.to_vec());
        };

        names
            .iter()
            .map(|name| {
                EntityKind::EXPORTED
                    .into_iter()
                    .find(|kind| kind.path() == name.as_str())
                    .ok_or_else(|| ExportError::InvalidConfigValue {
                        field: "export.collections".to_string(),
                        value: name.clone(),
                        reason: "Valid collections: companies, users, deals".to_string(),
                    })
            })
            .collect()
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case("debug"))
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.source.base_url
    }

    fn api_key(&self) -> &str {
        &self.source.api_key
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn excluded_keys(&self) -> HashSet<String> {
        self.export.exclude.iter().cloned().collect()
    }

    fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        match self.export.on_unknown_field {
            UnknownFieldSetting::Fail => UnknownFieldPolicy::Fail,
            UnknownFieldSetting::Skip => UnknownFieldPolicy::Skip,
        }
    }

    fn quote_policy(&self) -> QuotePolicy {
        match self.export.quotes {
            QuoteSetting::Escape => QuotePolicy::Escape,
            QuoteSetting::Fold => QuotePolicy::Fold,
        }
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.source.timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)?;
        if self.source.api_key.starts_with("${") {
            return Err(ExportError::MissingConfig {
                field: format!("source.api_key ({} is not set)", self.source.api_key),
            });
        }
        self.collections()?;
        Ok(())
    }
}
