//! Application services that sit between the ledger model and its callers.

pub mod services;
pub mod time;

pub use services::PaymentRegistry;
pub use time::{Clock, ManualClock, SystemClock};
