//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the external services the wallet core consumes:
//! payment rails, chain status, identity verification and trading.

pub mod chain;
pub mod kyc;
pub mod payment;
pub mod providers;
pub mod trading;

pub use chain::{
    ChainState, ChainStatus, ChainStatusProvider, SubmissionReceipt, TransactionDescriptor,
};
pub use kyc::{KycProvider, KycStatus};
pub use payment::{PaymentProvider, ProviderReceipt};
pub use providers::Providers;
pub use trading::{TradeReceipt, TradingProvider};
