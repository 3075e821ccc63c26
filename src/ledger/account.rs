use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;

/// A money account whose balance is derived entirely from its transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub currency: CurrencyCode,
    pub starting_balance: Decimal,
    #[serde(default)]
    pub current_balance: Decimal,
    #[serde(default)]
    pub turnover_incoming: Decimal,
    #[serde(default)]
    pub turnover_outgoing: Decimal,
    #[serde(default)]
    pub turnover_end_balance: Decimal,
}

impl Account {
    /// Creates an account whose derived figures start at the opening balance.
    pub fn new(name: impl Into<String>, currency: CurrencyCode, starting_balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            currency,
            starting_balance,
            current_balance: starting_balance,
            turnover_incoming: Decimal::ZERO,
            turnover_outgoing: Decimal::ZERO,
            turnover_end_balance: starting_balance,
        }
    }
}
