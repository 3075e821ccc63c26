use rust_decimal::Decimal;

use crate::cli::commands::{parse_amount, require_args, resolve_account, short_id};
use crate::cli::core::{CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::currency::{format_amount, CurrencyCode};
use crate::ledger::Account;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "accounts",
            "List accounts with derived balances",
            "accounts",
            cmd_accounts,
        ),
        CommandEntry::new(
            "open-account",
            "Open a new account",
            "open-account <name> [currency] [starting_balance]",
            cmd_open_account,
        ),
        CommandEntry::new(
            "set-start",
            "Change an account's starting balance",
            "set-start <account> <amount>",
            cmd_set_start,
        )
        .with_args(&[ArgKind::Account]),
    ]
}

fn cmd_accounts(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let accounts = context.ledger.accounts()?;
    if accounts.is_empty() {
        output::info("No accounts yet. Use `open-account <name>` to create one.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = accounts
        .iter()
        .map(|account| {
            vec![
                short_id(account.id),
                account.name.clone(),
                account.currency.to_string(),
                format_amount(account.starting_balance, &account.currency),
                format_amount(account.turnover_incoming, &account.currency),
                format_amount(account.turnover_outgoing, &account.currency),
                format_amount(account.current_balance, &account.currency),
            ]
        })
        .collect();
    output::section("Accounts");
    output::plain(output::render_table(
        &["ID", "Name", "Cur", "Start", "In", "Out", "Balance"],
        &rows,
    ));
    Ok(())
}

fn cmd_open_account(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "open-account <name> [currency] [starting_balance]")?;
    let currency = args
        .get(1)
        .map(|code| CurrencyCode::new(*code))
        .unwrap_or_else(|| context.config.base_currency());
    let starting = match args.get(2) {
        Some(raw) => parse_amount(raw)?,
        None => Decimal::ZERO,
    };
    let account = context
        .ledger
        .open_account(Account::new(args[0], currency, starting))?;
    output::success(format!(
        "Account `{}` opened ({}) with balance {}.",
        account.name,
        short_id(account.id),
        format_amount(account.current_balance, &account.currency)
    ));
    Ok(())
}

fn cmd_set_start(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 2, "set-start <account> <amount>")?;
    let account = resolve_account(context, args[0])?;
    let amount = parse_amount(args[1])?;
    let updated = context.ledger.set_starting_balance(account.id, amount)?;
    output::success(format!(
        "Starting balance of `{}` set; balance now {}.",
        updated.name,
        format_amount(updated.current_balance, &updated.currency)
    ));
    Ok(())
}
