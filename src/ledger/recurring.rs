use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::errors::{LedgerError, Result};

/// Direction of money movement relative to the account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationKind::Deposit => "Deposit",
            OperationKind::Withdraw => "Withdraw",
        };
        f.write_str(label)
    }
}

/// Where inside its period a recurring payment fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    /// ISO weekday, Monday = 1 through Sunday = 7.
    Weekly { weekday: u8 },
    /// Day of month; clamped to the month's length when it is shorter.
    Monthly { day: u8 },
    Yearly { day: u8, month: u8 },
}

impl Cadence {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Cadence::Daily => Ok(()),
            Cadence::Weekly { weekday } => {
                if (1..=7).contains(&weekday) {
                    Ok(())
                } else {
                    Err(LedgerError::validation(format!(
                        "weekday must be between 1 and 7, got {weekday}"
                    )))
                }
            }
            Cadence::Monthly { day } => {
                if (1..=31).contains(&day) {
                    Ok(())
                } else {
                    Err(LedgerError::validation(format!(
                        "day of month must be between 1 and 31, got {day}"
                    )))
                }
            }
            Cadence::Yearly { day, month } => {
                if !(1..=12).contains(&month) {
                    return Err(LedgerError::validation(format!(
                        "month must be between 1 and 12, got {month}"
                    )));
                }
                let longest = match month {
                    2 => 29,
                    4 | 6 | 9 | 11 => 30,
                    _ => 31,
                };
                if (1..=longest).contains(&day) {
                    Ok(())
                } else {
                    Err(LedgerError::validation(format!(
                        "day {day} does not exist in month {month}"
                    )))
                }
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Cadence::Daily => "Daily".into(),
            Cadence::Weekly { weekday } => format!("Weekly on day {weekday}"),
            Cadence::Monthly { day } => format!("Monthly on the {day}"),
            Cadence::Yearly { day, month } => format!("Yearly on {day:02}/{month:02}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub cadence: Cadence,
    pub time_of_day: NaiveTime,
}

impl Schedule {
    pub fn new(cadence: Cadence, time_of_day: NaiveTime) -> Self {
        Self {
            cadence,
            time_of_day,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.cadence.validate()
    }

    pub fn label(&self) -> String {
        format!("{} at {}", self.cadence.label(), self.time_of_day.format("%H:%M"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Active,
    Paused,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Active => "Active",
            PaymentStatus::Paused => "Paused",
        };
        f.write_str(label)
    }
}

/// A stored instruction to create a ledger transaction on a schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringPayment {
    pub id: Uuid,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: String,
    pub account_id: Uuid,
    pub currency: CurrencyCode,
    pub operation: OperationKind,
    pub amount: Decimal,
    pub schedule: Schedule,
    #[serde(default)]
    pub status: PaymentStatus,
    /// `None` means the next firing has to be recomputed before the payment can fire.
    #[serde(default)]
    pub next_occurrence_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurringPayment {
    pub fn from_draft(draft: PaymentDraft, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: draft.category,
            subcategory: draft.subcategory,
            description: draft.description,
            account_id: draft.account_id,
            currency: draft.currency,
            operation: draft.operation,
            amount: draft.amount,
            schedule: draft.schedule,
            status: PaymentStatus::Active,
            next_occurrence_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, PaymentStatus::Active)
    }

    /// Active with a computed next occurrence at or before `now`.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.is_active()
            && self
                .next_occurrence_at
                .map(|next| next <= now)
                .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "recurring amount must be positive, got {}",
                self.amount
            )));
        }
        if self.category.trim().is_empty() {
            return Err(LedgerError::validation("category is required"));
        }
        Ok(())
    }
}

/// User input for creating a recurring payment.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub category: String,
    pub subcategory: Option<String>,
    pub description: String,
    pub account_id: Uuid,
    pub currency: CurrencyCode,
    pub operation: OperationKind,
    pub amount: Decimal,
    pub schedule: Schedule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_ranges_are_enforced() {
        assert!(Cadence::Weekly { weekday: 7 }.validate().is_ok());
        assert!(Cadence::Weekly { weekday: 0 }.validate().is_err());
        assert!(Cadence::Monthly { day: 32 }.validate().is_err());
        assert!(Cadence::Yearly { day: 29, month: 2 }.validate().is_ok());
        assert!(Cadence::Yearly { day: 31, month: 4 }.validate().is_err());
        assert!(Cadence::Yearly { day: 1, month: 13 }.validate().is_err());
    }

    #[test]
    fn cadence_serializes_with_period_tag() {
        let json = serde_json::to_string(&Cadence::Monthly { day: 15 }).unwrap();
        assert_eq!(json, r#"{"period":"monthly","day":15}"#);
        let parsed: Cadence = serde_json::from_str(r#"{"period":"daily"}"#).unwrap();
        assert_eq!(parsed, Cadence::Daily);
    }
}
