use std::sync::RwLock;

use uuid::Uuid;

use super::{LedgerStore, PaymentStore};
use crate::{
    errors::{LedgerError, Result},
    ledger::{LedgerSnapshot, RecurringPayment},
};

/// Process-local store for tests and throwaway CLI sessions.
#[derive(Default)]
pub struct InMemoryStore {
    payments: RwLock<Vec<RecurringPayment>>,
    ledger: RwLock<Option<LedgerSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a ledger snapshot, as if loaded from disk.
    pub fn with_ledger(snapshot: LedgerSnapshot) -> Self {
        Self {
            payments: RwLock::new(Vec::new()),
            ledger: RwLock::new(Some(snapshot)),
        }
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Storage("in-memory store lock poisoned".into())
}

impl PaymentStore for InMemoryStore {
    fn load_payments(&self) -> Result<Vec<RecurringPayment>> {
        Ok(self.payments.read().map_err(|_| poisoned())?.clone())
    }

    fn find_payment(&self, id: Uuid) -> Result<Option<RecurringPayment>> {
        let guard = self.payments.read().map_err(|_| poisoned())?;
        Ok(guard.iter().find(|payment| payment.id == id).cloned())
    }

    fn save_payment(&self, payment: &RecurringPayment) -> Result<()> {
        let mut guard = self.payments.write().map_err(|_| poisoned())?;
        match guard.iter_mut().find(|existing| existing.id == payment.id) {
            Some(existing) => *existing = payment.clone(),
            None => guard.push(payment.clone()),
        }
        Ok(())
    }

    fn delete_payment(&self, id: Uuid) -> Result<bool> {
        let mut guard = self.payments.write().map_err(|_| poisoned())?;
        let before = guard.len();
        guard.retain(|payment| payment.id != id);
        Ok(guard.len() != before)
    }
}

impl LedgerStore for InMemoryStore {
    fn load_ledger(&self) -> Result<LedgerSnapshot> {
        let guard = self.ledger.read().map_err(|_| poisoned())?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        *self.ledger.write().map_err(|_| poisoned())? = Some(snapshot.clone());
        Ok(())
    }
}
