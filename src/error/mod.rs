//! Error types and handling module.
//!
//! Defines all application-specific error types and conversions.
//!
//! Per-query read failures are not errors: they travel as data inside
//! [`crate::transport::ReadOutcome`] and degrade only the affected record.
//! `AppError` covers configuration problems (fatal at startup) and whole-batch
//! transport failures (recovered per chain by the balance fetcher).

use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors (malformed registry, missing env vars).
    /// Fatal at startup, never produced mid-cycle.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chain RPC errors.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transport errors (a whole batch or request failed).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Quote feed errors (the off-chain price request failed).
    #[error("Quote feed error: {0}")]
    QuoteFeed(String),

    /// A chain id was referenced that the registry does not know.
    #[error("Unknown chain id: {0}")]
    UnknownChain(u64),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<alloy::transports::TransportError> for AppError {
    fn from(err: alloy::transports::TransportError) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<alloy::contract::Error> for AppError {
    fn from(err: alloy::contract::Error) -> Self {
        AppError::Rpc(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::QuoteFeed(err.to_string())
    }
}

impl From<alloy::hex::FromHexError> for AppError {
    fn from(err: alloy::hex::FromHexError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::Parse(err.to_string())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
