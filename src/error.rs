use std::fmt;

use thiserror::Error;

use crate::domain::error::ValidationError;
use crate::domain::{TransactionId, TransactionStatus, Usd, UserId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// External service a provider error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Payment,
    Chain,
    Kyc,
    Trading,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Payment => "payment",
            ProviderKind::Chain => "chain",
            ProviderKind::Kyc => "kyc",
            ProviderKind::Trading => "trading",
        };
        f.write_str(s)
    }
}

/// Errors reported by external providers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider refused the request. Never retried.
    #[error("{provider} provider rejected the request: {reason}")]
    Rejected { provider: ProviderKind, reason: String },

    /// The provider could not be reached or answered with a server error.
    #[error("{provider} provider unavailable: {reason}")]
    Unavailable { provider: ProviderKind, reason: String },

    #[error("{provider} provider timed out")]
    Timeout { provider: ProviderKind },

    /// Identity verification is not complete.
    #[error("identity verification required (status: {status})")]
    VerificationRequired { status: String },
}

impl ProviderError {
    /// Returns true if a retry may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable { .. } | ProviderError::Timeout { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Usd, available: Usd },

    /// The stored balance failed its invariants; further updates are refused.
    #[error("balance for user {user_id} is corrupted: {reason}")]
    BalanceCorruption { user_id: UserId, reason: String },

    /// Applying the transaction would leave a figure outside the decimal range.
    #[error("balance for user {user_id} would overflow")]
    BalanceOverflow { user_id: UserId },

    #[error("no balance session for user {user_id}")]
    UnknownUser { user_id: UserId },

    #[error("transaction {id} not found")]
    TransactionNotFound { id: TransactionId },

    #[error("transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("routing aborted at step {step}: {reason}")]
    RoutingAborted { step: usize, reason: String },

    #[error("timed out waiting for lock '{key}'")]
    LockTimeout { key: String },

    #[error("timed out waiting for confirmation of {id}")]
    ConfirmationTimeout { id: TransactionId },

    #[error("service is shutting down")]
    ShuttingDown,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
