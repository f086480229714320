use crate::domain::settings::Settings;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShippingError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Package is not quotable: missing {field}")]
    NotQuotable { field: String },

    #[error("Pricing lookup failed for service {service_id}: {message}")]
    PricingLookupFailed { service_id: u32, message: String },

    #[error("Courier API returned an unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] CredentialError),

    #[error("Diagnostic log failure at {path}: {message}")]
    LogIoFailure { path: String, message: String },
}

/// Reasons a credential change is refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    /// The account is broken and the stored credentials are the built-in
    /// pair; the submitted record has been reset to that pair.
    #[error("incorrect account details")]
    RolledBackToDefault { settings: Box<Settings> },

    #[error("current instance not authenticated")]
    NotAuthenticated,

    #[error("incorrect account details")]
    IncorrectAccountDetails,
}

impl CredentialError {
    /// The reset record carried by a rollback, if any.
    pub fn rolled_back_settings(&self) -> Option<&Settings> {
        match self {
            CredentialError::RolledBackToDefault { settings } => Some(settings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ShippingError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ShippingError::PricingLookupFailed { .. } | ShippingError::NotQuotable { .. } => {
                ErrorSeverity::Low
            }
            ShippingError::ApiError(_)
            | ShippingError::UnexpectedResponse { .. }
            | ShippingError::InvalidCredentials(_) => ErrorSeverity::Medium,
            ShippingError::ConfigError { .. }
            | ShippingError::ConfigValidationError { .. }
            | ShippingError::InvalidConfigValueError { .. }
            | ShippingError::MissingConfigError { .. }
            | ShippingError::SerializationError(_) => ErrorSeverity::High,
            ShippingError::IoError(_)
            | ShippingError::ZipError(_)
            | ShippingError::LogIoFailure { .. } => ErrorSeverity::Critical,
        }
    }

    /// Message shown to merchants in place of the technical description.
    pub fn user_friendly_message(&self) -> String {
        match self {
            ShippingError::InvalidCredentials(_) => {
                "Your MDS account details are incorrect, new settings have been discarded."
                    .to_string()
            }
            ShippingError::ApiError(_) | ShippingError::UnexpectedResponse { .. } => {
                "Unable to reach the MDS Collivery API, please try again later.".to_string()
            }
            ShippingError::LogIoFailure { .. } => {
                "Unable to write the MDS log files, check the log directory permissions."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShippingError>;
