//! Multi-chain wallet: per-chain views, routing options and route execution.
//!
//! The wallet never mutates the ledger. It reads balances net of fund
//! reservations, proposes routing plans and validates them on a scratch copy;
//! the resulting [`RouteExecution`](crate::domain::RouteExecution) rides on the transaction until the
//! confirmation gateway applies it.

mod multichain;

pub use multichain::{MultiChainWallet, UnifiedBalance};
