use std::sync::{Arc, RwLock, RwLockReadGuard};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    account::Account,
    balance::{BalanceRecalculator, RecomputeStats},
    transaction::{
        Page, RecurringOrigin, TransactionDraft, TransactionFilter, TransactionPatch,
        TransactionRecord,
    },
};
use crate::{
    core::time::Clock,
    currency::{round_money, CurrencyCode, RateBoard},
    errors::{LedgerError, Result},
    storage::LedgerStore,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

fn default_schema_version() -> u8 {
    CURRENT_SCHEMA_VERSION
}

/// Everything the ledger persists: accounts plus the full record history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            accounts: Vec::new(),
            transactions: Vec::new(),
            updated_at: None,
        }
    }
}

impl LedgerSnapshot {
    pub fn recompute(&mut self) -> RecomputeStats {
        BalanceRecalculator::recompute(&mut self.accounts, &mut self.transactions)
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&TransactionRecord> {
        self.transactions.iter().find(|record| record.id == id)
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.transactions
            .iter()
            .position(|record| record.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    fn require_account(&self, id: Uuid) -> Result<&Account> {
        self.account(id)
            .ok_or_else(|| LedgerError::validation(format!("unknown account {id}")))
    }
}

/// Ordered transaction history with balances kept consistent after every mutation.
///
/// Mutations run against a copy of the current state, recompute every account,
/// persist through the injected [`LedgerStore`], and only then replace the
/// published state. Readers never observe a half-applied change, and a failed
/// save leaves the ledger exactly as it was.
pub struct TransactionLedger {
    state: RwLock<LedgerSnapshot>,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    rates: Arc<RateBoard>,
    reporting_currencies: Vec<CurrencyCode>,
}

impl TransactionLedger {
    /// Loads the persisted snapshot and re-derives all balances from it.
    pub fn open(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut snapshot = store.load_ledger()?;
        if snapshot.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(LedgerError::Storage(format!(
                "ledger schema version {} is newer than supported version {}",
                snapshot.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        snapshot.schema_version = CURRENT_SCHEMA_VERSION;
        let stats = snapshot.recompute();
        if stats.orphaned > 0 {
            tracing::warn!(
                orphaned = stats.orphaned,
                "ledger contains records for unknown accounts"
            );
        }
        tracing::info!(
            accounts = stats.accounts,
            records = stats.records,
            "ledger opened"
        );
        Ok(Self {
            state: RwLock::new(snapshot),
            store,
            clock,
            rates: Arc::new(RateBoard::new()),
            reporting_currencies: Vec::new(),
        })
    }

    pub fn with_rates(mut self, rates: Arc<RateBoard>) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_reporting_currencies(mut self, currencies: Vec<CurrencyCode>) -> Self {
        self.reporting_currencies = currencies;
        self
    }

    pub fn rates(&self) -> &Arc<RateBoard> {
        &self.rates
    }

    /// Appends a fully formed record, e.g. one produced by the scheduler.
    pub fn append(&self, record: TransactionRecord) -> Result<TransactionRecord> {
        let id = record.id;
        self.commit(
            |state| {
                if state.transaction(id).is_some() {
                    return Err(LedgerError::validation(format!(
                        "transaction {id} already exists"
                    )));
                }
                let record = self.prepare(state, record)?;
                state.transactions.push(record);
                Ok(())
            },
            |state, _| fetch(state, id),
        )
    }

    /// Creates records from drafts; either all of them land or none do.
    pub fn create(&self, drafts: Vec<TransactionDraft>) -> Result<Vec<TransactionRecord>> {
        self.commit(
            |state| {
                let mut ids = Vec::with_capacity(drafts.len());
                for draft in drafts {
                    let account_id = draft
                        .account_id
                        .ok_or_else(|| LedgerError::validation("account is required"))?;
                    let currency = state.require_account(account_id)?.currency.clone();
                    let record = self.prepare(state, draft.into_record(&currency)?)?;
                    ids.push(record.id);
                    state.transactions.push(record);
                }
                Ok(ids)
            },
            |state, ids| ids.into_iter().map(|id| fetch(state, id)).collect(),
        )
    }

    /// Replaces the record with its patched version and recomputes.
    /// Applies `patch` to a record. An empty patch returns the record without a write.
    pub fn update(&self, id: Uuid, patch: TransactionPatch) -> Result<TransactionRecord> {
        if !patch.has_effect() {
            return self.get(id);
        }
        self.commit(
            |state| {
                let idx = state.position(id)?;
                let replaced = patch.applied_to(&state.transactions[idx]);
                let replaced = self.prepare(state, replaced)?;
                state.transactions[idx] = replaced;
                Ok(())
            },
            |state, _| fetch(state, id),
        )
    }

    /// Deletes a record and returns it as it was before removal.
    pub fn remove(&self, id: Uuid) -> Result<TransactionRecord> {
        self.commit(
            |state| {
                let idx = state.position(id)?;
                Ok(state.transactions.remove(idx))
            },
            |_, removed| Ok(removed),
        )
    }

    /// Re-appends a copy of `id` stamped with the current clock time.
    pub fn duplicate(&self, id: Uuid) -> Result<TransactionRecord> {
        let now = self.clock.now();
        self.commit(
            |state| {
                let idx = state.position(id)?;
                let copy = state.transactions[idx].duplicate_at(now);
                let copy = self.prepare(state, copy)?;
                let copy_id = copy.id;
                state.transactions.push(copy);
                Ok(copy_id)
            },
            fetch,
        )
    }

    /// Newest first, then paged. `page` is 1-based; a `page_size` of 0 returns everything.
    pub fn list(
        &self,
        filter: &TransactionFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<TransactionRecord>> {
        let state = self.read()?;
        let mut matching: Vec<&TransactionRecord> = state
            .transactions
            .iter()
            .filter(|record| filter.matches(record))
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let total = matching.len();
        let page = page.max(1);
        let items = if page_size == 0 {
            matching.into_iter().cloned().collect()
        } else {
            matching
                .into_iter()
                .skip((page - 1).saturating_mul(page_size))
                .take(page_size)
                .cloned()
                .collect()
        };
        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    pub fn get(&self, id: Uuid) -> Result<TransactionRecord> {
        let state = self.read()?;
        fetch(&state, id)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.transactions.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether a record for this scheduled occurrence was already appended.
    pub fn contains_occurrence(&self, origin: &RecurringOrigin) -> Result<bool> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .any(|record| record.origin.as_ref() == Some(origin)))
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.read()?.accounts.clone())
    }

    pub fn account(&self, id: Uuid) -> Result<Account> {
        self.read()?
            .account(id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub fn open_account(&self, account: Account) -> Result<Account> {
        let id = account.id;
        self.commit(
            |state| {
                if account.name.trim().is_empty() {
                    return Err(LedgerError::validation("account name is required"));
                }
                if state.account(id).is_some() {
                    return Err(LedgerError::validation(format!(
                        "account {id} already exists"
                    )));
                }
                state.accounts.push(account);
                Ok(())
            },
            |state, _| fetch_account(state, id),
        )
    }

    pub fn set_starting_balance(&self, id: Uuid, amount: Decimal) -> Result<Account> {
        self.commit(
            |state| {
                let account = state
                    .accounts
                    .iter_mut()
                    .find(|account| account.id == id)
                    .ok_or(LedgerError::AccountNotFound(id))?;
                account.starting_balance = round_money(amount);
                Ok(())
            },
            |state, _| fetch_account(state, id),
        )
    }

    /// Re-derives and persists every balance; running it twice changes nothing.
    pub fn recompute(&self) -> Result<RecomputeStats> {
        self.commit(|state| Ok(state.recompute()), |_, stats| Ok(stats))
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerSnapshot>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("ledger state lock poisoned".into()))
    }

    fn commit<T, R>(
        &self,
        op: impl FnOnce(&mut LedgerSnapshot) -> Result<T>,
        view: impl FnOnce(&LedgerSnapshot, T) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| LedgerError::Storage("ledger state lock poisoned".into()))?;
        let mut next = guard.clone();
        let outcome = op(&mut next)?;
        let stats = next.recompute();
        next.updated_at = Some(self.clock.now());
        let result = view(&next, outcome)?;
        self.store.save_ledger(&next)?;
        *guard = next;
        tracing::debug!(
            accounts = stats.accounts,
            records = stats.records,
            "ledger recomputed"
        );
        Ok(result)
    }

    fn prepare(
        &self,
        state: &LedgerSnapshot,
        mut record: TransactionRecord,
    ) -> Result<TransactionRecord> {
        record.validate()?;
        state.require_account(record.account_id)?;
        record.amount = round_money(record.amount);
        record.snapshot_amounts = self
            .reporting_currencies
            .iter()
            .map(|target| {
                let converted = self.rates.convert(
                    record.amount,
                    record.currency.as_str(),
                    target.as_str(),
                );
                (target.as_str().to_string(), converted)
            })
            .collect();
        Ok(record)
    }
}

fn fetch(state: &LedgerSnapshot, id: Uuid) -> Result<TransactionRecord> {
    state
        .transaction(id)
        .cloned()
        .ok_or(LedgerError::TransactionNotFound(id))
}

fn fetch_account(state: &LedgerSnapshot, id: Uuid) -> Result<Account> {
    state
        .account(id)
        .cloned()
        .ok_or(LedgerError::AccountNotFound(id))
}
