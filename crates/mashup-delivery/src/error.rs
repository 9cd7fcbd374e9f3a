//! Delivery error types.

use thiserror::Error;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Errors that can occur while packaging or sending a mashup.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Email credentials not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Archive failed: {0}")]
    Archive(String),

    #[error("Email failed: {0}")]
    Email(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn email(msg: impl Into<String>) -> Self {
        Self::Email(msg.into())
    }

    /// Whether the failure comes from configuration rather than the transport.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DeliveryError::NotConfigured(_) | DeliveryError::InvalidAddress(_)
        )
    }
}

impl From<zip::result::ZipError> for DeliveryError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}
