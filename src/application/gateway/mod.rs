//! Confirmation gateway: submission, polling and the confirmation hand-off.
//!
//! The gateway is the only component that calls
//! [`BalanceLedger::apply_confirmed`](crate::application::ledger::BalanceLedger::apply_confirmed). Each submitted transaction gets one
//! cancellable polling task; callers are never blocked by it and can wait on
//! [`ConfirmationGateway::await_terminal`] instead.

mod confirmation;
mod poll;

pub use confirmation::{ConfirmationGateway, GatewaySettings};
pub use poll::PollPolicy;
