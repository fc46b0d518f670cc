//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the wallet core and the services it does not
//! implement. Adapters plug in behind them; the application layer only ever
//! sees the traits.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  ledger, wallet, router │
//!     ┌──────────────┤  gateway, service       ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     │                  │                 │                  │
//!     ▼                  ▼                 ▼                  ▼
//! ┌─────────┐      ┌───────────┐     ┌───────────┐      ┌───────────┐
//! │ Payment │      │  Chain    │     │   KYC     │      │  Trading  │
//! │ Adapter │      │  Status   │     │  Adapter  │      │  Adapter  │
//! └─────────┘      └───────────┘     └───────────┘      └───────────┘
//! ```

pub mod outbound;

pub use outbound::{
    ChainState, ChainStatus, ChainStatusProvider, KycProvider, KycStatus, PaymentProvider,
    ProviderReceipt, Providers, SubmissionReceipt, TradeReceipt, TradingProvider,
    TransactionDescriptor,
};
