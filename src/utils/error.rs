use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Address not found: {address}")]
    AddressNotFound { address: String },

    #[error("Upstream {service} request failed: {message}")]
    UpstreamError { service: String, message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Geocoding,
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    /// 將任何上游失敗（網路、非 2xx、格式錯誤）統一為 UpstreamError
    pub fn upstream(service: &str, err: impl std::fmt::Display) -> Self {
        EtlError::UpstreamError {
            service: service.to_string(),
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::AddressNotFound { .. } => ErrorCategory::Geocoding,
            EtlError::UpstreamError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_) | EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Geocoding => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::AddressNotFound { .. } => {
                "Check the address spelling or add city, state and postal code"
            }
            EtlError::UpstreamError { .. } => {
                "Check network connectivity and the geocoder / feature server endpoints, then re-run"
            }
            EtlError::IoError(_) => "Check that the input file exists and the output path is writable",
            EtlError::ZipError(_) => "Disable [load.archive] or check free disk space",
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Inspect the upstream responses with --verbose"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix the TOML configuration file or the command line flags"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::AddressNotFound { address } => {
                format!("Could not geocode address '{}'", address)
            }
            EtlError::UpstreamError { service, .. } => {
                format!("The {} service could not be reached or returned an error", service)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            EtlError::MissingConfigError { field } => format!("Missing setting '{}'", field),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_are_retryable_severity() {
        let err = EtlError::upstream("nominatim", "connection refused");
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.to_string().contains("nominatim"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_address_not_found_is_low_severity() {
        let err = EtlError::AddressNotFound {
            address: "bogus".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "Could not geocode address 'bogus'");
    }
}
