//! Interactive and scripted shell over the ledger, registry and scheduler.

pub mod commands;
pub mod core;
pub mod output;
pub mod registry;
mod shell;

pub use shell::run_cli;
