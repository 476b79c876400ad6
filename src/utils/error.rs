use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Script '{script}' exited with code {code:?}: {stderr}")]
    ScriptFailed {
        script: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Script '{script}' did not finish within {seconds}s")]
    ScriptTimeout { script: String, seconds: u64 },

    #[error("Script '{script}' produced unusable output: {message}")]
    ScriptOutputError { script: String, message: String },

    #[error("Script '{script}' reported an error: {message}")]
    ScriptReported { script: String, message: String },

    #[error("No stores selected for routing (demand threshold {threshold})")]
    NoStoresSelected { threshold: f64 },

    #[error("{feature} is not implemented")]
    NotImplemented { feature: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Script,
    Storage,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::NoStoresSelected { .. } => ErrorCategory::Input,
            Self::ScriptFailed { .. }
            | Self::ScriptTimeout { .. }
            | Self::ScriptOutputError { .. }
            | Self::ScriptReported { .. } => ErrorCategory::Script,
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) | Self::ZipError(_) => {
                ErrorCategory::Storage
            }
            Self::NotImplemented { .. } => ErrorCategory::Unsupported,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ValidationError { .. } | Self::NoStoresSelected { .. } | Self::NotImplemented { .. } => {
                ErrorSeverity::Low
            }
            Self::ScriptTimeout { .. } | Self::ScriptReported { .. } => ErrorSeverity::Medium,
            Self::ScriptFailed { .. }
            | Self::ScriptOutputError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ZipError(_) => ErrorSeverity::High,
            Self::IoError(_)
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Short message that is safe to show in the dashboard.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } => format!("Invalid request: {}", message),
            Self::NoStoresSelected { threshold } => format!(
                "No stores exceed the demand threshold of {}. Lower the threshold and try again.",
                threshold
            ),
            Self::NotImplemented { feature } => format!("{} is not available yet", feature),
            Self::ScriptFailed { script, .. } | Self::ScriptOutputError { script, .. } => {
                format!("The {} step failed", script)
            }
            Self::ScriptTimeout { script, .. } => format!("The {} step took too long", script),
            Self::ScriptReported { message, .. } => message.clone(),
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Server configuration is invalid".to_string(),
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) | Self::ZipError(_) => {
                "Internal server error".to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML configuration file and CLI overrides",
            ErrorCategory::Input => "Adjust the request parameters",
            ErrorCategory::Script => {
                "Inspect the script's stderr output or enable scripts.fallback_to_mock"
            }
            ErrorCategory::Storage => "Check that data paths exist and are readable",
            ErrorCategory::Unsupported => "Use one of the CSV export endpoints instead",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_errors_are_script_category() {
        let err = DashboardError::ScriptFailed {
            script: "train".to_string(),
            code: Some(1),
            stderr: "boom".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Script);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.user_friendly_message(), "The train step failed");
    }

    #[test]
    fn test_reported_message_is_relayed() {
        let err = DashboardError::ScriptReported {
            script: "predict".to_string(),
            message: "Trained model not found".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "Trained model not found");
        assert!(err.to_string().contains("predict"));
    }
}
