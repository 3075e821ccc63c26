use rust_decimal::Decimal;

use crate::cli::commands::{parse_amount, parse_date, require_args};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::currency::{format_amount, CurrencyCode, ExchangeRateSnapshot};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "rates",
            "Show or update the latest exchange-rate snapshot",
            "rates [set <FROM> <TO> <rate> [YYYY-MM-DD]]",
            cmd_rates,
        )
        .with_args(&[ArgKind::Keyword(&["set"])]),
        CommandEntry::new(
            "convert",
            "Convert an amount with the latest rates",
            "convert <amount> <from> <to>",
            cmd_convert,
        ),
    ]
}

fn cmd_rates(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|sub| sub.to_ascii_lowercase()) {
        None => show_rates(context),
        Some(sub) if sub == "set" => set_rate(context, &args[1..]),
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown rates subcommand `{other}`"
        ))),
    }
}

fn show_rates(context: &ShellContext) -> CommandResult {
    let Some(snapshot) = context.rates.latest() else {
        output::info("No exchange rates published yet.");
        return Ok(());
    };
    let rows: Vec<Vec<String>> = snapshot
        .pairs()
        .map(|(pair, rate)| vec![pair.to_string(), rate.to_string()])
        .collect();
    output::section(format!("Rates as of {}", snapshot.date));
    output::plain(output::render_table(&["Pair", "Rate"], &rows));
    Ok(())
}

/// Publishes a new snapshot carrying the previous pairs plus the given one.
fn set_rate(context: &ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 3, "rates set <FROM> <TO> <rate> [YYYY-MM-DD]")?;
    let rate = parse_amount(args[2])?;
    if rate <= Decimal::ZERO {
        return Err(CommandError::InvalidArguments("rate must be positive".into()));
    }
    let date = match args.get(3) {
        Some(raw) => parse_date(raw)?,
        None => context.clock.today(),
    };
    let base = match context.rates.latest() {
        Some(latest) => {
            let mut next = (*latest).clone();
            next.date = next.date.max(date);
            next
        }
        None => ExchangeRateSnapshot::new(date),
    };
    let from = CurrencyCode::new(args[0]);
    let to = CurrencyCode::new(args[1]);
    let snapshot = base.with_rate(from.as_str(), to.as_str(), rate);
    if let Some(storage) = &context.storage {
        storage.save_rates(&snapshot)?;
    }
    let date = snapshot.date;
    context.rates.publish(snapshot);
    output::success(format!("Rate {}/{} = {} published for {}.", from, to, rate, date));
    Ok(())
}

fn cmd_convert(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 3, "convert <amount> <from> <to>")?;
    let amount = parse_amount(args[0])?;
    let from = CurrencyCode::new(args[1]);
    let to = CurrencyCode::new(args[2]);
    match context.rates.convert(amount, from.as_str(), to.as_str()) {
        Some(converted) => output::info(format!(
            "{} = {}",
            format_amount(amount, &from),
            format_amount(converted, &to)
        )),
        None => output::warning(format!("No rate available for {} to {}.", from, to)),
    }
    Ok(())
}
