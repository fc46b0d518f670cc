//! Provider-agnostic wallet domain: balances, transactions, fees and routes.

mod asset;
mod balance;
mod chain;
mod event;
mod fee;
mod id;
mod money;
mod request;
mod route;
mod transaction;

pub mod error;

pub use asset::{AssetCatalog, AssetInfo};
pub use balance::{AssetHolding, Balance, ChainBalance};
pub use chain::{AssetSymbol, Chain};
pub use error::ValidationError;
pub use event::{EventKind, LedgerEvent};
pub use fee::{FeeQuote, FeeSchedule, KindFees, RoutingFees, DEFAULT_MAX_AMOUNT};
pub use id::{TransactionId, UserId};
pub use money::{round_cents, Usd};
pub use request::{Handle, TransactionInput, TransactionRequest, WalletAddress};
pub use route::{ChainDebit, RouteExecution, RoutingPlan, RoutingStep, StepKind};
pub use transaction::{
    AssetTrade, FeeSnapshot, PaymentMethod, PaymentSource, Transaction, TransactionCategory,
    TransactionKind, TransactionStatus,
};
