#![doc(test(attr(deny(warnings))))]

//! Recurring payment scheduling and a transaction ledger whose account
//! balances are re-derived from the full history after every change.

pub mod cli;
pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod scheduler;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("ops_ledger tracing initialized.");
    });
}
