//! Command-line adapter for the `diboas` binary.

pub mod command;
pub mod config;
pub mod output;
pub mod simulate;
