//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the document database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP status into the matching error variant.
    pub fn from_http_status(status: u16, detail: String) -> Self {
        match status {
            401 | 403 => Self::PermissionDenied(detail),
            404 => Self::NotFound(detail),
            409 => Self::AlreadyExists(detail),
            429 => Self::RateLimited,
            _ => Self::RequestFailed(detail),
        }
    }

    /// Approximate HTTP status for metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::PermissionDenied(_) => Some(403),
            Self::RateLimited => Some(429),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Network(e) => !e.is_builder() && !e.is_decode(),
            Self::RequestFailed(msg) => msg.contains("status 5"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            StoreError::from_http_status(404, String::new()),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from_http_status(409, String::new()),
            StoreError::AlreadyExists(_)
        ));
        assert!(matches!(
            StoreError::from_http_status(429, String::new()),
            StoreError::RateLimited
        ));
        assert!(matches!(
            StoreError::from_http_status(500, String::new()),
            StoreError::RequestFailed(_)
        ));
    }

    #[test]
    fn retryable_errors() {
        assert!(StoreError::RateLimited.is_retryable());
        assert!(!StoreError::not_found("x").is_retryable());
        assert!(StoreError::request_failed("status 503").is_retryable());
        assert!(!StoreError::request_failed("status 400").is_retryable());
    }
}
