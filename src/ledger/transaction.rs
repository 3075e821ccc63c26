use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recurring::{OperationKind, RecurringPayment};
use crate::currency::CurrencyCode;
use crate::errors::{LedgerError, Result};

const DUPLICATE_PREFIX: &str = "Copy of ";

/// Identifies the scheduled occurrence a scheduler-generated record stands for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RecurringOrigin {
    pub payment_id: Uuid,
    pub scheduled_for: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub timestamp: NaiveDateTime,
    pub account_id: Uuid,
    pub operation: OperationKind,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    /// Amount expressed in each reporting currency; `None` when no rate was available.
    #[serde(default)]
    pub snapshot_amounts: BTreeMap<String, Option<Decimal>>,
    #[serde(default)]
    pub balance_before: Decimal,
    #[serde(default)]
    pub balance_after: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<RecurringOrigin>,
}

impl TransactionRecord {
    pub fn new(
        account_id: Uuid,
        operation: OperationKind,
        amount: Decimal,
        currency: CurrencyCode,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            account_id,
            operation,
            amount,
            currency,
            category: String::new(),
            subcategory: None,
            description: String::new(),
            counterparty_id: None,
            order_id: None,
            snapshot_amounts: BTreeMap::new(),
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            origin: None,
        }
    }

    /// Builds the record a recurring payment produces when it fires at `fired_at`.
    pub fn from_recurring(
        payment: &RecurringPayment,
        scheduled_for: NaiveDateTime,
        fired_at: NaiveDateTime,
    ) -> Self {
        let mut record = Self::new(
            payment.account_id,
            payment.operation,
            payment.amount,
            payment.currency.clone(),
            fired_at,
        );
        record.category = payment.category.clone();
        record.subcategory = payment.subcategory.clone();
        record.description = payment.description.clone();
        record.origin = Some(RecurringOrigin {
            payment_id: payment.id,
            scheduled_for,
        });
        record
    }

    /// Signed effect on the owning account's balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.operation {
            OperationKind::Deposit => self.amount,
            OperationKind::Withdraw => -self.amount,
        }
    }

    /// Copy with a fresh identity, stamped at `now`, detached from any schedule.
    pub fn duplicate_at(&self, now: NaiveDateTime) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy.timestamp = now;
        copy.description = format!("{}{}", DUPLICATE_PREFIX, self.description);
        copy.origin = None;
        copy
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "transaction amount must not be negative, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Form-style input for a user-created transaction; required fields are checked on submit.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub account_id: Option<Uuid>,
    pub operation: Option<OperationKind>,
    pub amount: Option<Decimal>,
    pub timestamp: Option<NaiveDateTime>,
    pub currency: Option<CurrencyCode>,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: String,
    pub counterparty_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
}

impl TransactionDraft {
    pub fn new(
        account_id: Uuid,
        operation: OperationKind,
        amount: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            account_id: Some(account_id),
            operation: Some(operation),
            amount: Some(amount),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Turns the draft into a record, defaulting the currency to the account's.
    pub fn into_record(self, account_currency: &CurrencyCode) -> Result<TransactionRecord> {
        let account_id = self
            .account_id
            .ok_or_else(|| LedgerError::validation("account is required"))?;
        let amount = self
            .amount
            .ok_or_else(|| LedgerError::validation("amount is required"))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| LedgerError::validation("date is required"))?;
        let operation = self.operation.unwrap_or(OperationKind::Withdraw);
        let currency = self.currency.unwrap_or_else(|| account_currency.clone());

        let mut record = TransactionRecord::new(account_id, operation, amount, currency, timestamp);
        record.category = self.category;
        record.subcategory = self.subcategory;
        record.description = self.description;
        record.counterparty_id = self.counterparty_id;
        record.order_id = self.order_id;
        record.validate()?;
        Ok(record)
    }
}

/// Partial update applied by replace-then-recompute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Option<Uuid>>,
}

impl TransactionPatch {
    pub fn has_effect(&self) -> bool {
        self.account_id.is_some()
            || self.operation.is_some()
            || self.amount.is_some()
            || self.timestamp.is_some()
            || self.currency.is_some()
            || self.category.is_some()
            || self.subcategory.is_some()
            || self.description.is_some()
            || self.counterparty_id.is_some()
            || self.order_id.is_some()
    }

    /// Produces the replacement record; the original is left as it was.
    pub fn applied_to(&self, original: &TransactionRecord) -> TransactionRecord {
        let mut next = original.clone();
        if let Some(account_id) = self.account_id {
            next.account_id = account_id;
        }
        if let Some(operation) = self.operation {
            next.operation = operation;
        }
        if let Some(amount) = self.amount {
            next.amount = amount;
        }
        if let Some(timestamp) = self.timestamp {
            next.timestamp = timestamp;
        }
        if let Some(currency) = &self.currency {
            next.currency = currency.clone();
        }
        if let Some(category) = &self.category {
            next.category = category.clone();
        }
        if let Some(subcategory) = &self.subcategory {
            next.subcategory = subcategory.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(counterparty) = self.counterparty_id {
            next.counterparty_id = counterparty;
        }
        if let Some(order) = self.order_id {
            next.order_id = order;
        }
        next
    }
}

/// Listing filter; every set field must match.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<Uuid>,
    pub operation: Option<OperationKind>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub text: Option<String>,
}

impl TransactionFilter {
    pub fn for_account(account_id: Uuid) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if self.account_id.is_some_and(|id| id != record.account_id) {
            return false;
        }
        if self.operation.is_some_and(|op| op != record.operation) {
            return false;
        }
        if let Some(category) = &self.category {
            if !record.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        let date = record.timestamp.date();
        if self.from.is_some_and(|from| date < from) {
            return false;
        }
        if self.to.is_some_and(|to| date > to) {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !record.description.to_lowercase().contains(&needle)
                && !record.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn draft_requires_account_amount_and_date() {
        let usd = CurrencyCode::new("USD");
        let missing_amount = TransactionDraft {
            account_id: Some(Uuid::new_v4()),
            timestamp: Some(noon()),
            ..TransactionDraft::default()
        };
        let err = missing_amount.into_record(&usd).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ref m) if m.contains("amount")));

        let missing_date = TransactionDraft {
            account_id: Some(Uuid::new_v4()),
            amount: Some(Decimal::ONE),
            ..TransactionDraft::default()
        };
        assert!(missing_date.into_record(&usd).is_err());
    }

    #[test]
    fn draft_defaults_currency_to_account() {
        let eur = CurrencyCode::new("EUR");
        let record = TransactionDraft::new(
            Uuid::new_v4(),
            OperationKind::Deposit,
            Decimal::new(1050, 2),
            noon(),
        )
        .into_record(&eur)
        .unwrap();
        assert_eq!(record.currency, eur);
        assert_eq!(record.signed_amount(), Decimal::new(1050, 2));
    }

    #[test]
    fn patch_leaves_original_untouched() {
        let original = TransactionRecord::new(
            Uuid::new_v4(),
            OperationKind::Withdraw,
            Decimal::new(20, 0),
            CurrencyCode::default(),
            noon(),
        );
        let patch = TransactionPatch {
            amount: Some(Decimal::new(25, 0)),
            ..TransactionPatch::default()
        };
        let replaced = patch.applied_to(&original);
        assert_eq!(replaced.amount, Decimal::new(25, 0));
        assert_eq!(original.amount, Decimal::new(20, 0));
        assert_eq!(replaced.id, original.id);
    }
}
