//! Outbound adapters (driven side).

pub mod retry;
pub mod simulated;
