//! Error types for the Tezoro client.
//!
//! This module defines all error types that can occur in the client, from the
//! pure parameter/state derivation routines to the backend API and the EVM
//! JSON-RPC layer.

use thiserror::Error;

/// Main error type for Tezoro client operations
#[derive(Error, Debug)]
pub enum TezoroError {
    /// Discount/fee arithmetic produced a non-finite or negative value
    #[error("Invalid fee computation: {0}")]
    InvalidFeeComputation(String),

    /// Backup contract reported a state code outside 0..=4
    #[error("Unknown backup state code: {0}")]
    UnknownBackupState(u64),

    /// Address failed format validation
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Backend API answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the error body, or the raw body
        message: String,
    },

    /// Backend rejected the bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated call attempted without a token
    #[error("API token is undefined, set a token first")]
    MissingToken,

    /// Error reported by the JSON-RPC node
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction receipt did not arrive in time
    #[error("Transaction timeout after {0} seconds")]
    TransactionTimeout(u64),

    /// Expected event missing from a receipt
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// Pre-flight `eth_call` of a transaction reverted
    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {0} seconds")]
    RateLimitExceeded(u64),

    /// Max retries exceeded
    #[error("Max retries ({0}) exceeded")]
    MaxRetriesExceeded(usize),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// ABI lookup or encoding error
    #[error("ABI error: {0}")]
    AbiError(#[from] ethers::abi::Error),

    /// Hex decode error
    #[error("Hex decode error: {0}")]
    HexError(#[from] alloy_primitives::hex::FromHexError),

    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
}

/// Result type alias for Tezoro client operations
pub type Result<T> = std::result::Result<T, TezoroError>;

/// Error context for retryable operations
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Number of attempts made
    pub attempts: usize,
    /// Last error encountered
    pub last_error: String,
    /// Total time spent retrying (in milliseconds)
    pub total_time_ms: u64,
}

impl RetryContext {
    /// Create a new retry context
    pub fn new() -> Self {
        Self {
            attempts: 0,
            last_error: String::new(),
            total_time_ms: 0,
        }
    }

    /// Record an attempt
    pub fn record_attempt(&mut self, error: &str, duration_ms: u64) {
        self.attempts += 1;
        self.last_error = error.to_string();
        self.total_time_ms += duration_ms;
    }
}

impl Default for RetryContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TezoroError::UnknownBackupState(7);
        assert_eq!(err.to_string(), "Unknown backup state code: 7");

        let err = TezoroError::MissingToken;
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_api_error_display() {
        let err = TezoroError::Api {
            status: 422,
            message: "Backup not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 422): Backup not found");
    }

    #[test]
    fn test_retry_context() {
        let mut ctx = RetryContext::new();
        assert_eq!(ctx.attempts, 0);

        ctx.record_attempt("error 1", 100);
        assert_eq!(ctx.attempts, 1);
        assert_eq!(ctx.last_error, "error 1");
        assert_eq!(ctx.total_time_ms, 100);

        ctx.record_attempt("error 2", 200);
        assert_eq!(ctx.attempts, 2);
        assert_eq!(ctx.last_error, "error 2");
        assert_eq!(ctx.total_time_ms, 300);
    }
}
