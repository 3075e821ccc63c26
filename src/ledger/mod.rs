//! Ledger domain: recurring payment definitions, schedules, transaction records and balances.

pub mod account;
pub mod balance;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod recurrence;
pub mod recurring;
pub mod transaction;

pub use account::Account;
pub use balance::{BalanceRecalculator, RecomputeStats};
pub use ledger::{LedgerSnapshot, TransactionLedger, CURRENT_SCHEMA_VERSION};
pub use recurrence::{compute_next, compute_next_after};
pub use recurring::{
    Cadence, OperationKind, PaymentDraft, PaymentStatus, RecurringPayment, Schedule,
};
pub use transaction::{
    Page, RecurringOrigin, TransactionDraft, TransactionFilter, TransactionPatch, TransactionRecord,
};
