//! Full re-derivation of account balances from the transaction set.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use super::{account::Account, recurring::OperationKind, transaction::TransactionRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecomputeStats {
    pub accounts: usize,
    pub records: usize,
    /// Records pointing at an account the ledger does not know.
    pub orphaned: usize,
}

#[derive(Default, Clone, Copy)]
struct Turnover {
    incoming: Decimal,
    outgoing: Decimal,
}

/// Recomputes every account from scratch; order of `records` does not affect totals.
pub struct BalanceRecalculator;

impl BalanceRecalculator {
    pub fn recompute(accounts: &mut [Account], records: &mut [TransactionRecord]) -> RecomputeStats {
        let mut turnover: HashMap<Uuid, Turnover> = HashMap::with_capacity(accounts.len());
        for record in records.iter() {
            let entry = turnover.entry(record.account_id).or_default();
            match record.operation {
                OperationKind::Deposit => entry.incoming += record.amount,
                OperationKind::Withdraw => entry.outgoing += record.amount,
            }
        }

        let mut running: HashMap<Uuid, Decimal> = HashMap::with_capacity(accounts.len());
        for account in accounts.iter_mut() {
            let totals = turnover.get(&account.id).copied().unwrap_or_default();
            account.turnover_incoming = totals.incoming;
            account.turnover_outgoing = totals.outgoing;
            account.current_balance = account.starting_balance + totals.incoming - totals.outgoing;
            account.turnover_end_balance = account.current_balance;
            running.insert(account.id, account.starting_balance);
        }

        let known: HashSet<Uuid> = accounts.iter().map(|account| account.id).collect();
        let mut orphaned = 0usize;
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by_key(|&idx| (records[idx].timestamp, records[idx].id));
        for idx in order {
            let record = &mut records[idx];
            if !known.contains(&record.account_id) {
                orphaned += 1;
            }
            let balance = running.entry(record.account_id).or_insert(Decimal::ZERO);
            record.balance_before = *balance;
            *balance += record.signed_amount();
            record.balance_after = *balance;
        }

        RecomputeStats {
            accounts: accounts.len(),
            records: records.len(),
            orphaned,
        }
    }

    /// `starting + deposits - withdrawals` for one account, computed independently of stored fields.
    pub fn expected_balance(account: &Account, records: &[TransactionRecord]) -> Decimal {
        records
            .iter()
            .filter(|record| record.account_id == account.id)
            .fold(account.starting_balance, |acc, record| {
                acc + record.signed_amount()
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::currency::CurrencyCode;

    #[test]
    fn running_balances_follow_timestamp_order() {
        let mut accounts = vec![Account::new(
            "Main",
            CurrencyCode::default(),
            Decimal::new(100, 0),
        )];
        let id = accounts[0].id;
        let t0 = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let later = TransactionRecord::new(
            id,
            OperationKind::Withdraw,
            Decimal::new(30, 0),
            CurrencyCode::default(),
            t0 + Duration::hours(2),
        );
        let earlier = TransactionRecord::new(
            id,
            OperationKind::Deposit,
            Decimal::new(50, 0),
            CurrencyCode::default(),
            t0,
        );
        let mut records = vec![later, earlier];

        let stats = BalanceRecalculator::recompute(&mut accounts, &mut records);

        assert_eq!(stats.orphaned, 0);
        assert_eq!(accounts[0].current_balance, Decimal::new(120, 0));
        assert_eq!(accounts[0].turnover_incoming, Decimal::new(50, 0));
        assert_eq!(accounts[0].turnover_outgoing, Decimal::new(30, 0));
        assert_eq!(records[1].balance_before, Decimal::new(100, 0));
        assert_eq!(records[1].balance_after, Decimal::new(150, 0));
        assert_eq!(records[0].balance_before, Decimal::new(150, 0));
        assert_eq!(records[0].balance_after, Decimal::new(120, 0));
    }

    #[test]
    fn orphaned_records_are_counted_not_applied() {
        let mut accounts = vec![Account::new("Main", CurrencyCode::default(), Decimal::ZERO)];
        let mut records = vec![TransactionRecord::new(
            Uuid::new_v4(),
            OperationKind::Deposit,
            Decimal::ONE,
            CurrencyCode::default(),
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )];
        let stats = BalanceRecalculator::recompute(&mut accounts, &mut records);
        assert_eq!(stats.orphaned, 1);
        assert_eq!(accounts[0].current_balance, Decimal::ZERO);
    }
}
