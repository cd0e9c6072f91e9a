use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("{path} not found: {message}")]
    NotFound { path: String, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Errors that may clear up on their own
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimited | ApiError::ServiceUnavailable | ApiError::Timeout(_) => true,
            ApiError::Request(e) => e.is_timeout() || e.is_connect(),
            ApiError::Api { status, .. } => *status == 409 || *status >= 500,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Authentication(_) => Some(401),
            ApiError::RateLimited => Some(429),
            ApiError::ServiceUnavailable => Some(503),
            _ => None,
        }
    }
}
