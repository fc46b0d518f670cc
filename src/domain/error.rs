//! Validation errors for transaction requests and ledger input.
//!
//! Every variant is raised before any side effect takes place.

use rust_decimal::Decimal;
use thiserror::Error;

use super::TransactionKind;

/// Malformed, missing or out-of-range input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A field required by the transaction type was not supplied.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The `type` field does not name a supported transaction type.
    #[error("unknown transaction type '{value}'")]
    UnknownTransactionType {
        /// The rejected value.
        value: String,
    },

    /// The amount is not a finite decimal number.
    #[error("amount '{value}' is not a valid number")]
    InvalidAmount {
        /// The rejected value, as received.
        value: String,
    },

    /// Amounts must be strictly positive.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// The amount is under the per-type minimum.
    #[error("{kind} amount {amount} is below the minimum of {minimum}")]
    BelowMinimum {
        kind: TransactionKind,
        amount: Decimal,
        minimum: Decimal,
    },

    /// The amount is over the configured per-transaction maximum.
    #[error("amount {amount} exceeds the maximum of {maximum}")]
    AboveMaximum { amount: Decimal, maximum: Decimal },

    /// Fees would consume more than the transaction amount.
    #[error("fees {fees} exceed amount {amount}")]
    FeesExceedAmount { amount: Decimal, fees: Decimal },

    /// Recipient handle or address is malformed.
    #[error("invalid recipient '{value}': {reason}")]
    InvalidRecipient {
        value: String,
        reason: &'static str,
    },

    /// The asset is not on the allow-list for this transaction type.
    #[error("asset '{asset}' is not supported for {kind}")]
    UnsupportedAsset {
        asset: String,
        kind: TransactionKind,
    },

    /// Unknown payment method name.
    #[error("unsupported payment method '{value}'")]
    InvalidPaymentMethod {
        /// The rejected value.
        value: String,
    },

    /// Sell or other asset-bound type without asset data on the record.
    #[error("{kind} transaction has no asset leg")]
    MissingAssetLeg { kind: TransactionKind },
}
