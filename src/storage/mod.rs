//! Persistence seams. The core never owns a storage engine; it talks to these traits.

pub mod json_backend;
pub mod memory;

use uuid::Uuid;

use crate::{
    errors::Result,
    ledger::{LedgerSnapshot, RecurringPayment},
};

/// External store holding recurring payment definitions.
pub trait PaymentStore: Send + Sync {
    fn load_payments(&self) -> Result<Vec<RecurringPayment>>;
    fn find_payment(&self, id: Uuid) -> Result<Option<RecurringPayment>>;
    fn save_payment(&self, payment: &RecurringPayment) -> Result<()>;
    /// Returns whether a payment was actually removed.
    fn delete_payment(&self, id: Uuid) -> Result<bool>;
}

/// External store holding the ledger's accounts and transaction records.
pub trait LedgerStore: Send + Sync {
    /// Returns the persisted snapshot, or an empty one on first use.
    fn load_ledger(&self) -> Result<LedgerSnapshot>;
    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> Result<()>;
}

pub use json_backend::JsonStorage;
pub use memory::InMemoryStore;
