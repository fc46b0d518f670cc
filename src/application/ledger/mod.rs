//! Balance ledger: the canonical balance and transaction history per user.
//!
//! All state sits behind one [`parking_lot::Mutex`]. Every mutation runs as a
//! single critical section against a scratch copy of the balance, is
//! committed only if the accounting invariants hold, and emits its events
//! after the lock has been released.

mod apply;
mod balance;
mod bus;
mod history;
mod lock;
mod settled;

pub use balance::{
    BalanceLedger, ConfirmationOutcome, FundHold, LedgerSettings, LedgerSnapshot, ReservationKey,
    TransactionUpdate,
};
pub use bus::{EventBus, EventCallback, Subscription};
pub use lock::{LockGuard, LockRegistry};
pub use settled::SettledEntry;
