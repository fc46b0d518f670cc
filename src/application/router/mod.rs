//! Transaction router: validate, plan, compute fees, dispatch.
//!
//! Planning runs under the per-user logical lock so that route selection and
//! fund reservation are atomic with respect to other requests of the same
//! user. The lock is dropped before any provider is called.

mod handler;
mod planner;

pub use planner::{balance_lock, PlannedTransaction, RoutingSettings, TransactionRouter};
