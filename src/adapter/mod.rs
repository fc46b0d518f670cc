//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - The `diboas` command line
//! - [`outbound`] - Simulated providers and the chain retry wrapper

pub mod inbound;
pub mod outbound;
