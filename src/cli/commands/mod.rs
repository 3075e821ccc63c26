//! Shell command handlers plus the argument parsing they share.

pub mod account;
pub mod currency;
pub mod payment;
pub mod system;
pub mod transaction;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cli::core::{CommandError, ShellContext};
use crate::cli::registry::{CommandGroup, CommandRegistry};
use crate::ledger::{Account, Cadence, OperationKind};

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    registry.register_group(CommandGroup::Accounts, account::definitions());
    registry.register_group(CommandGroup::Transactions, transaction::definitions());
    registry.register_group(CommandGroup::Payments, payment::definitions());
    registry.register_group(CommandGroup::Currency, currency::definitions());
    registry.register_group(CommandGroup::System, system::definitions());
}

pub(crate) fn short_id(id: Uuid) -> String {
    let mut short = id.simple().to_string();
    short.truncate(8);
    short
}

pub(crate) fn require_args(args: &[&str], count: usize, usage: &str) -> Result<(), CommandError> {
    if args.len() < count {
        Err(CommandError::InvalidArguments(format!("usage: {usage}")))
    } else {
        Ok(())
    }
}

pub(crate) fn parse_amount(input: &str) -> Result<Decimal, CommandError> {
    Decimal::from_str(input.trim())
        .map_err(|_| CommandError::InvalidArguments(format!("invalid amount `{input}`")))
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD HH:MM`.
pub(crate) fn parse_timestamp(input: &str) -> Result<NaiveDateTime, CommandError> {
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(parsed);
        }
    }
    Ok(parse_date(input)?.and_time(NaiveTime::MIN))
}

pub(crate) fn looks_like_date(input: &str) -> bool {
    input.len() >= 10 && input.as_bytes()[4] == b'-' && input.as_bytes()[7] == b'-'
}

pub(crate) fn parse_time(input: &str) -> Result<NaiveTime, CommandError> {
    NaiveTime::parse_from_str(input, "%H:%M").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid time `{}` (use HH:MM)", input))
    })
}

pub(crate) fn parse_operation(input: &str) -> Result<OperationKind, CommandError> {
    match input.to_ascii_lowercase().as_str() {
        "deposit" | "in" => Ok(OperationKind::Deposit),
        "withdraw" | "out" => Ok(OperationKind::Withdraw),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown operation `{other}` (use deposit or withdraw)"
        ))),
    }
}

/// Parses `daily`, `weekly:<1-7>`, `monthly:<1-31>` or `yearly:<day>-<month>`.
pub(crate) fn parse_cadence(input: &str) -> Result<Cadence, CommandError> {
    let lowered = input.to_ascii_lowercase();
    let (period, param) = match lowered.split_once(':') {
        Some((period, param)) => (period, Some(param)),
        None => (lowered.as_str(), None),
    };
    let number = |value: &str| {
        value.parse::<u8>().map_err(|_| {
            CommandError::InvalidArguments(format!("invalid number `{value}` in `{input}`"))
        })
    };
    let cadence = match (period, param) {
        ("daily", None) => Cadence::Daily,
        ("weekly", Some(day)) => Cadence::Weekly {
            weekday: number(day)?,
        },
        ("monthly", Some(day)) => Cadence::Monthly { day: number(day)? },
        ("yearly", Some(date)) => {
            let (day, month) = date.split_once('-').ok_or_else(|| {
                CommandError::InvalidArguments(format!("yearly needs <day>-<month>, got `{date}`"))
            })?;
            Cadence::Yearly {
                day: number(day)?,
                month: number(month)?,
            }
        }
        _ => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown cadence `{input}` (daily, weekly:N, monthly:D, yearly:D-M)"
            )))
        }
    };
    cadence.validate()?;
    Ok(cadence)
}

/// Finds exactly one id starting with `prefix`.
pub(crate) fn match_id(
    prefix: &str,
    ids: impl IntoIterator<Item = Uuid>,
    kind: &str,
) -> Result<Uuid, CommandError> {
    let needle = prefix.trim().to_ascii_lowercase().replace('-', "");
    if needle.is_empty() {
        return Err(CommandError::InvalidArguments(format!("{kind} id is required")));
    }
    let mut found = ids
        .into_iter()
        .filter(|id| id.simple().to_string().starts_with(&needle));
    match (found.next(), found.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => Err(CommandError::InvalidArguments(format!(
            "no {kind} matches `{prefix}`"
        ))),
        (Some(_), Some(_)) => Err(CommandError::InvalidArguments(format!(
            "`{prefix}` matches more than one {kind}; use more characters"
        ))),
    }
}

/// Accounts resolve by case-insensitive name first, then by id prefix.
pub(crate) fn resolve_account(context: &ShellContext, token: &str) -> Result<Account, CommandError> {
    let accounts = context.ledger.accounts()?;
    if let Some(account) = accounts
        .iter()
        .find(|account| account.name.eq_ignore_ascii_case(token))
    {
        return Ok(account.clone());
    }
    let id = match_id(token, accounts.iter().map(|account| account.id), "account")?;
    Ok(context.ledger.account(id)?)
}
