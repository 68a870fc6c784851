//! Layered error definitions
//!
//! Categorized by source: config / client / response / data

use thiserror::Error;

/// Errors raised at the language-model client boundary.
///
/// These are never retried by the pipeline; retry policy belongs to the
/// client implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The request could not be delivered or the backend answered with an error status
    #[error("request failed: {0}")]
    Request(String),

    /// The backend did not answer within the configured timeout
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The backend rejected the request with a rate limit
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication was rejected (HTTP 401/403)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The backend answered with a body that could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Client Errors =====
    /// Language-model call failed
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    // ===== Response Errors =====
    /// A constrained response did not match the expected schema
    #[error("response schema mismatch: {message}")]
    ResponseSchema { message: String },

    // ===== Data Errors =====
    /// Example window violates the token/activation invariant
    #[error("invalid example: {message}")]
    InvalidExample { message: String },

    /// Two stages tried to write different values into the same record field
    #[error("field '{field}' of record '{feature}' is already set")]
    FieldConflict { feature: String, field: String },

    /// Records with different identifiers cannot be merged
    #[error("cannot merge record '{left}' with record '{right}'")]
    IdentityMismatch { left: String, right: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create response schema error
    pub fn response_schema(message: impl Into<String>) -> Self {
        Self::ResponseSchema {
            message: message.into(),
        }
    }

    /// Create invalid example error
    pub fn invalid_example(message: impl Into<String>) -> Self {
        Self::InvalidExample {
            message: message.into(),
        }
    }

    /// Create field conflict error
    pub fn field_conflict(feature: impl ToString, field: impl Into<String>) -> Self {
        Self::FieldConflict {
            feature: feature.to_string(),
            field: field.into(),
        }
    }
}
