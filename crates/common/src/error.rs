//! Universal error types for Vantage.

use thiserror::Error;

/// Top-level error type for all Vantage operations.
#[derive(Debug, Error)]
pub enum VantageError {
    #[error("Protocol error ({protocol}): {message}")]
    Protocol {
        protocol: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type VantageResult<T> = Result<T, VantageError>;
