use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Lead store at {path} is corrupt: {message}")]
    CorruptStore { path: String, message: String },
}

impl CrmError {
    pub fn validation(message: impl Into<String>) -> Self {
        CrmError::ValidationError {
            message: message.into(),
        }
    }

    /// Short message suitable for the operator, without the variant prefix.
    pub fn user_friendly_message(&self) -> String {
        match self {
            CrmError::ValidationError { message } => message.clone(),
            CrmError::CorruptStore { path, .. } => {
                format!("The lead database {} could not be read", path)
            }
            CrmError::ConfigError { message } => format!("Configuration problem: {}", message),
            CrmError::ConfigValidationError { field, message } => {
                format!("Configuration field '{}': {}", field, message)
            }
            CrmError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}': {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
