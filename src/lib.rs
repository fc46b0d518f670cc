//! diboas-core - transactional core of a custodial multi-chain wallet.
//!
//! Tracks per-user balances (liquid, invested and strategy), turns loosely
//! typed requests into planned transactions with frozen fee snapshots, routes
//! value across chains and mutates balances only once an external
//! confirmation signal arrives.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Balances, transactions, fees, chains and request parsing
//! - [`port`] - Traits for external payment, chain, KYC and trading services
//! - [`application`] - Ledger, wallet, router, confirmation gateway and the
//!   [`application::TransactionService`] facade
//! - [`adapter`] - Simulated providers, the chain retry wrapper and the CLI
//! - [`infrastructure`] - Configuration and service wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use diboas_core::application::ProcessOptions;
//! use diboas_core::domain::{TransactionInput, UserId};
//! use diboas_core::infrastructure::bootstrap::build_simulated;
//! use diboas_core::infrastructure::config::Config;
//!
//! # async fn demo() -> diboas_core::error::Result<()> {
//! let config = Config::parse_toml("")?;
//! let (service, _providers) = build_simulated(&config);
//! let user = UserId::new("alice");
//! service.open_session(&user)?;
//!
//! let input = TransactionInput::new("add", 100).payment_method("card");
//! let outcome = service
//!     .process_transaction(&user, &input, ProcessOptions::awaiting_confirmation())
//!     .await?;
//! println!("available: {}", outcome.balance.available_for_spending());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
