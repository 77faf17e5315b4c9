use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Authentication failed ({status}): {message}")]
    AuthError { status: u16, message: String },

    #[error("Submission failed for {transaction_id}: {message}")]
    ApiError {
        transaction_id: String,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Network,
    Data,
    Configuration,
    System,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::AuthError { .. } => ErrorCategory::Authentication,
            EtlError::ApiError { .. } | EtlError::HttpError(_) => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::AuthError { .. } => ErrorSeverity::Critical,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::High,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorSeverity::High,
            EtlError::HttpError(_) => ErrorSeverity::Medium,
            // 單筆交易失敗會被轉成 error row，不會中斷整批
            EtlError::ApiError { .. } => ErrorSeverity::Low,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::AuthError { status, .. } => {
                format!(
                    "Could not authenticate against the fraud API (HTTP {})",
                    status
                )
            }
            EtlError::ApiError { transaction_id, .. } => {
                format!("Submission rejected for transaction {}", transaction_id)
            }
            EtlError::HttpError(_) => "Could not reach the fraud API".to_string(),
            EtlError::CsvError(_) => "The input file could not be read as CSV".to_string(),
            EtlError::IoError(_) => "A file could not be read or written".to_string(),
            EtlError::SerializationError(_) => "An API response could not be decoded".to_string(),
            EtlError::ConfigError { message } => message.clone(),
            EtlError::InvalidConfigValueError { field, .. } => {
                format!("Configuration value for '{}' is invalid", field)
            }
            EtlError::MissingConfigError { field } => {
                format!("Configuration value for '{}' is missing", field)
            }
            EtlError::ProcessingError { message } => message.clone(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Authentication => {
                "Check the basic-auth credential and tenant id, then rerun".to_string()
            }
            ErrorCategory::Network => {
                "Check the base URL and endpoint paths, and that the API is reachable".to_string()
            }
            ErrorCategory::Data => "Inspect the input CSV headers and the failing rows".to_string(),
            ErrorCategory::Configuration => {
                "Fix the flagged configuration value and rerun".to_string()
            }
            ErrorCategory::System => {
                "Check file paths and permissions for the input, output and TPS log".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
