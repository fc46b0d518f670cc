//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate the outbound
//! ports. The ledger is the only component that mutates balances; the
//! gateway is its only caller for confirmed transactions.

pub mod gateway;
pub mod ledger;
pub mod router;
pub mod service;
pub mod wallet;

pub use service::{ProcessOptions, ProcessOutcome, ServiceSettings, TransactionService};
