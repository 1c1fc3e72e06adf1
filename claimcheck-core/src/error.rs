//! Error types for the claimcheck core.
//!
//! Uses `thiserror` for public API error types. Only configuration errors are
//! expected to reach a pipeline caller; verifier and knowledge-source errors are
//! degraded to safe defaults at the call site and surface only in logs.

use std::path::PathBuf;

/// Top-level error type for the claimcheck core library.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Verifier error: {0}")]
    Verifier(#[from] VerifierError),

    #[error("Knowledge source error: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid claim state for {claim_id}: {message}")]
    InvalidState { claim_id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from verifier back-ends.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("API request failed: {message}")]
    Api { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for verifier {verifier}")]
    AuthFailed { verifier: String },

    #[error("Rate limited by verifier, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Verifier call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Verifier connection failed: {message}")]
    Connection { message: String },
}

/// Errors from external knowledge sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request to {source_name} failed: {message}")]
    Http {
        source_name: String,
        message: String,
    },

    #[error("Query to {source_name} timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("Failed to parse {source_name} response: {message}")]
    ResponseParse {
        source_name: String,
        message: String,
    },

    #[error("Knowledge source {source_name} is unavailable")]
    Unavailable { source_name: String },

    #[error("Refusing to query {source_name}: {message}")]
    InvalidQuery {
        source_name: String,
        message: String,
    },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("At least 2 verifiers are required for voting, got {available}")]
    TooFewVerifiers { available: usize },

    #[error("Invalid scoring weights: {message}")]
    InvalidWeights { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `CheckError`.
pub type Result<T> = std::result::Result<T, CheckError>;
