#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use ops_ledger::{
    core::{services::PaymentRegistry, time::ManualClock},
    currency::CurrencyCode,
    errors::{LedgerError, Result},
    ledger::{
        Account, Cadence, LedgerSnapshot, OperationKind, PaymentDraft, RecurringPayment, Schedule,
        TransactionLedger,
    },
    scheduler::SchedulerLoop,
    storage::{InMemoryStore, LedgerStore, PaymentStore},
};
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid timestamp")
}

pub fn money(value: &str) -> Decimal {
    value.parse().expect("valid decimal")
}

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    pub fail_ledger_saves: AtomicBool,
    pub fail_payment_saves: AtomicBool,
}

impl FlakyStore {
    pub fn fail_ledger(&self, fail: bool) {
        self.fail_ledger_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_payments(&self, fail: bool) {
        self.fail_payment_saves.store(fail, Ordering::SeqCst);
    }
}

fn unavailable() -> LedgerError {
    LedgerError::Storage("store unavailable".into())
}

impl PaymentStore for FlakyStore {
    fn load_payments(&self) -> Result<Vec<RecurringPayment>> {
        self.inner.load_payments()
    }

    fn find_payment(&self, id: Uuid) -> Result<Option<RecurringPayment>> {
        self.inner.find_payment(id)
    }

    fn save_payment(&self, payment: &RecurringPayment) -> Result<()> {
        if self.fail_payment_saves.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.save_payment(payment)
    }

    fn delete_payment(&self, id: Uuid) -> Result<bool> {
        self.inner.delete_payment(id)
    }
}

impl LedgerStore for FlakyStore {
    fn load_ledger(&self) -> Result<LedgerSnapshot> {
        self.inner.load_ledger()
    }

    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        if self.fail_ledger_saves.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.save_ledger(snapshot)
    }
}

/// Ledger, registry and scheduler wired to one flaky store and a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<FlakyStore>,
    pub ledger: Arc<TransactionLedger>,
    pub registry: Arc<PaymentRegistry>,
    pub scheduler: Arc<SchedulerLoop>,
}

impl Harness {
    pub fn new(start: NaiveDateTime) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(FlakyStore::default());
        let ledger = Arc::new(
            TransactionLedger::open(store.clone(), clock.clone()).expect("open ledger"),
        );
        let registry = Arc::new(PaymentRegistry::new(store.clone(), clock.clone()));
        let scheduler = Arc::new(SchedulerLoop::new(
            registry.clone(),
            ledger.clone(),
            clock.clone(),
            Duration::from_secs(60),
        ));
        Self {
            clock,
            store,
            ledger,
            registry,
            scheduler,
        }
    }

    pub fn open_account(&self, name: &str, starting: &str) -> Account {
        self.ledger
            .open_account(Account::new(name, CurrencyCode::new("USD"), money(starting)))
            .expect("open account")
    }

    pub fn add_payment(
        &self,
        account: &Account,
        operation: OperationKind,
        amount: &str,
        cadence: Cadence,
        hour: u32,
    ) -> RecurringPayment {
        self.registry
            .create(PaymentDraft {
                category: "Utilities".into(),
                subcategory: None,
                description: format!("{cadence:?}"),
                account_id: account.id,
                currency: account.currency.clone(),
                operation,
                amount: money(amount),
                schedule: Schedule::new(
                    cadence,
                    NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time"),
                ),
            })
            .expect("create payment")
    }
}
