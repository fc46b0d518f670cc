//! Infrastructure configuration modules.

pub mod assets;
pub mod fees;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod settings;

pub use settings::Config;
