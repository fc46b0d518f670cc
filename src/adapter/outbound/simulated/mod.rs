//! In-memory providers with scriptable outcomes.
//!
//! Every simulated provider succeeds by default. Failures are queued with
//! `fail_next*` and consumed one per call, so tests and the `simulate`
//! command can script exactly which call breaks.

mod chain;
mod kyc;
mod payment;
mod providers;
mod script;
mod trading;

pub use chain::{ChainBehavior, SimulatedChain};
pub use kyc::SimulatedKyc;
pub use payment::{PaymentRecord, SimulatedPayment};
pub use providers::SimulatedProviders;
pub use trading::SimulatedTrading;
