use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request to {url} returned status {status}")]
    ApiStatus { status: u16, url: String },

    #[error("No custom field definition for key '{key}' (field id '{field_id}')")]
    UnknownField { key: String, field_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Output,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that failed with this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::Transport(_) | ExportError::ApiStatus { .. } => ErrorCategory::Network,
            ExportError::UnknownField { .. } | ExportError::Serialization(_) => ErrorCategory::Data,
            ExportError::Io(_) => ErrorCategory::Output,
            ExportError::Config { .. }
            | ExportError::MissingConfig { .. }
            | ExportError::InvalidConfigValue { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::Transport(e) if e.is_timeout() || e.is_connect() => ErrorSeverity::Medium,
            ExportError::ApiStatus { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            ExportError::Io(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ExportError::Transport(_) => "Check network connectivity and the API base URL, then rerun",
            ExportError::ApiStatus { status: 401, .. } | ExportError::ApiStatus { status: 403, .. } => {
                "Check that PIPELINEDEALS_TOKEN holds a valid API key"
            }
            ExportError::ApiStatus { .. } => "The API rejected the request; retry later or check the base URL",
            ExportError::UnknownField { .. } => {
                "A custom field label is missing upstream; rerun with --skip-unknown-fields to export without it"
            }
            ExportError::Io(_) => "Check that the output directory exists and is writable",
            ExportError::Serialization(_) => "The API returned an unexpected payload",
            ExportError::Config { .. }
            | ExportError::MissingConfig { .. }
            | ExportError::InvalidConfigValue { .. } => {
                "Set PIPELINEDEALS_URI and PIPELINEDEALS_TOKEN (or pass --base-url/--api-key)"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch data from PipelineDeals: {}", self),
            ErrorCategory::Data => format!("Could not normalize exported records: {}", self),
            ErrorCategory::Output => format!("Could not write CSV output: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
