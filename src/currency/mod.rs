//! Currency codes, daily exchange-rate snapshots, and conversion helpers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits every monetary output is rounded to.
pub const MONEY_SCALE: u32 = 2;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        CurrencyCode::new(value)
    }
}

/// Rounds a monetary amount to two decimals, halves away from zero.
///
/// The result always carries exactly `MONEY_SCALE` fractional digits, so `100`
/// comes back as `100.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Read-only daily map of ordered currency pair to rate.
///
/// A rate stored under `FROM/TO` means one unit of `FROM` buys `rate` units of `TO`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRateSnapshot {
    pub date: NaiveDate,
    #[serde(default)]
    rates: BTreeMap<String, Decimal>,
}

impl ExchangeRateSnapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rates: BTreeMap::new(),
        }
    }

    /// Builder used by the ingestion side before the snapshot is published.
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates.insert(pair_key(from, to), rate);
        self
    }

    /// Rate for the exact ordered pair, if present.
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self.rates.get(&pair_key(from, to)).copied()
    }

    /// Stored pairs as `(FROM/TO, rate)`, in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.rates.iter().map(|(pair, rate)| (pair.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Resolves a usable rate, falling back to the reciprocal of the inverse pair.
    pub fn effective_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        if let Some(direct) = self.rate(from, to) {
            return Some(direct);
        }
        let inverse = self.rate(to, from)?;
        if inverse.is_zero() {
            return None;
        }
        Some(Decimal::ONE / inverse)
    }
}

fn pair_key(from: &str, to: &str) -> String {
    format!(
        "{}/{}",
        from.trim().to_ascii_uppercase(),
        to.trim().to_ascii_uppercase()
    )
}

/// Converts `amount` between currencies using `snapshot`.
///
/// Returns `None` when the snapshot holds neither the pair nor its inverse;
/// callers treat that as a blank value rather than a failure.
pub fn convert(
    amount: Decimal,
    from: &str,
    to: &str,
    snapshot: &ExchangeRateSnapshot,
) -> Option<Decimal> {
    if from.trim().eq_ignore_ascii_case(to.trim()) {
        return Some(round_money(amount));
    }
    let rate = snapshot.effective_rate(from, to)?;
    amount.checked_mul(rate).map(round_money)
}

/// Holds the most recent snapshot handed over by the rate-ingestion collaborator.
#[derive(Debug, Default)]
pub struct RateBoard {
    latest: RwLock<Option<Arc<ExchangeRateSnapshot>>>,
}

impl RateBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot unless the offered one is older.
    pub fn publish(&self, snapshot: ExchangeRateSnapshot) -> bool {
        let mut guard = match self.latest.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(current) = guard.as_ref() {
            if current.date > snapshot.date {
                tracing::debug!(
                    current = %current.date,
                    offered = %snapshot.date,
                    "ignoring stale rate snapshot"
                );
                return false;
            }
        }
        tracing::info!(date = %snapshot.date, pairs = snapshot.len(), "rate snapshot published");
        *guard = Some(Arc::new(snapshot));
        true
    }

    pub fn latest(&self) -> Option<Arc<ExchangeRateSnapshot>> {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Converts with the latest snapshot; same-currency works even before any publish.
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
        if from.trim().eq_ignore_ascii_case(to.trim()) {
            return Some(round_money(amount));
        }
        let snapshot = self.latest()?;
        convert(amount, from, to, &snapshot)
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "RUB" => "₽".into(),
        "UAH" => "₴".into(),
        _ => code.into(),
    }
}

/// Renders an amount with its currency symbol and grouped thousands, e.g. `$1,300.00`.
pub fn format_amount(amount: Decimal, code: &CurrencyCode) -> String {
    let rounded = round_money(amount);
    let body = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body.as_str(), "00"));
    let grouped = group_digits(int_part, ',');
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}{}.{}", sign, symbol_for(code.as_str()), grouped, frac_part)
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}
