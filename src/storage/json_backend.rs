use std::{
    fs,
    path::PathBuf,
    sync::Mutex,
};

use uuid::Uuid;

use super::{LedgerStore, PaymentStore};
use crate::{
    currency::ExchangeRateSnapshot,
    errors::{LedgerError, Result},
    ledger::{LedgerSnapshot, RecurringPayment},
    utils::persistence::{load_json, save_json},
};

const PAYMENTS_FILE: &str = "payments.json";
const LEDGER_FILE: &str = "ledger.json";
const RATES_FILE: &str = "rates.json";

/// JSON files under one data directory; every write is staged then renamed into place.
pub struct JsonStorage {
    root: PathBuf,
    // Serializes read-modify-write cycles on payments.json.
    payments_lock: Mutex<()>,
}

impl JsonStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            payments_lock: Mutex::new(()),
        })
    }

    pub fn payments_path(&self) -> PathBuf {
        self.root.join(PAYMENTS_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn rates_path(&self) -> PathBuf {
        self.root.join(RATES_FILE)
    }

    /// Reads the rate snapshot dropped next to the data files by the rate-ingestion job.
    pub fn load_rates(&self) -> Result<Option<ExchangeRateSnapshot>> {
        load_json(&self.rates_path())
    }

    pub fn save_rates(&self, snapshot: &ExchangeRateSnapshot) -> Result<()> {
        save_json(snapshot, &self.rates_path())
    }

    fn read_payments(&self) -> Result<Vec<RecurringPayment>> {
        Ok(load_json(&self.payments_path())?.unwrap_or_default())
    }

    fn lock_payments(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.payments_lock
            .lock()
            .map_err(|_| LedgerError::Storage("payments file lock poisoned".into()))
    }
}

impl PaymentStore for JsonStorage {
    fn load_payments(&self) -> Result<Vec<RecurringPayment>> {
        let _guard = self.lock_payments()?;
        self.read_payments()
    }

    fn find_payment(&self, id: Uuid) -> Result<Option<RecurringPayment>> {
        let _guard = self.lock_payments()?;
        Ok(self
            .read_payments()?
            .into_iter()
            .find(|payment| payment.id == id))
    }

    fn save_payment(&self, payment: &RecurringPayment) -> Result<()> {
        let _guard = self.lock_payments()?;
        let mut payments = self.read_payments()?;
        match payments.iter_mut().find(|existing| existing.id == payment.id) {
            Some(existing) => *existing = payment.clone(),
            None => payments.push(payment.clone()),
        }
        save_json(&payments, &self.payments_path())?;
        tracing::debug!(payment = %payment.id, "payment saved");
        Ok(())
    }

    fn delete_payment(&self, id: Uuid) -> Result<bool> {
        let _guard = self.lock_payments()?;
        let mut payments = self.read_payments()?;
        let before = payments.len();
        payments.retain(|payment| payment.id != id);
        if payments.len() == before {
            return Ok(false);
        }
        save_json(&payments, &self.payments_path())?;
        Ok(true)
    }
}

impl LedgerStore for JsonStorage {
    fn load_ledger(&self) -> Result<LedgerSnapshot> {
        Ok(load_json(&self.ledger_path())?.unwrap_or_default())
    }

    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        save_json(snapshot, &self.ledger_path())?;
        tracing::debug!(
            records = snapshot.transactions.len(),
            path = %self.ledger_path().display(),
            "ledger saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).unwrap();
        assert!(storage.load_payments().unwrap().is_empty());
        assert!(storage.load_ledger().unwrap().transactions.is_empty());
        assert!(storage.load_rates().unwrap().is_none());
    }

    #[test]
    fn delete_of_unknown_payment_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).unwrap();
        assert!(!storage.delete_payment(Uuid::new_v4()).unwrap());
        assert!(!storage.payments_path().exists());
    }
}
