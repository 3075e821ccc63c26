use uuid::Uuid;

use crate::cli::commands::{
    looks_like_date, match_id, parse_amount, parse_timestamp, require_args, resolve_account,
    short_id,
};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::currency::format_amount;
use crate::ledger::{
    Account, OperationKind, TransactionDraft, TransactionFilter, TransactionPatch, TransactionRecord,
};

const PAGE_SIZE: usize = 20;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "txns",
            "List transactions, newest first",
            "txns [account] [page]",
            cmd_list,
        )
        .with_args(&[ArgKind::Account]),
        CommandEntry::new(
            "deposit",
            "Record money coming into an account",
            "deposit <account> <amount> [YYYY-MM-DD[THH:MM]] [description...]",
            cmd_deposit,
        )
        .with_args(&[ArgKind::Account]),
        CommandEntry::new(
            "withdraw",
            "Record money leaving an account",
            "withdraw <account> <amount> [YYYY-MM-DD[THH:MM]] [description...]",
            cmd_withdraw,
        )
        .with_args(&[ArgKind::Account]),
        CommandEntry::new(
            "set-amount",
            "Change the amount of a transaction",
            "set-amount <transaction> <amount>",
            cmd_set_amount,
        )
        .with_args(&[ArgKind::Transaction]),
        CommandEntry::new(
            "remove-txn",
            "Delete a transaction",
            "remove-txn <transaction>",
            cmd_remove,
        )
        .with_args(&[ArgKind::Transaction]),
        CommandEntry::new(
            "duplicate",
            "Copy a transaction with the current time",
            "duplicate <transaction>",
            cmd_duplicate,
        )
        .with_args(&[ArgKind::Transaction]),
    ]
}

fn cmd_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let mut filter = TransactionFilter::default();
    let mut page = 1;
    for arg in args {
        match arg.parse::<usize>() {
            Ok(number) => page = number,
            Err(_) => filter.account_id = Some(resolve_account(context, arg)?.id),
        }
    }

    let listing = context.ledger.list(&filter, page, PAGE_SIZE)?;
    if listing.total == 0 {
        output::info("No transactions recorded.");
        return Ok(());
    }
    let rows = listing_rows(&listing.items, &context.ledger.accounts()?);
    output::section(format!(
        "Transactions (page {} of {}, {} total)",
        listing.page,
        listing.page_count(),
        listing.total
    ));
    output::plain(output::render_table(
        &["ID", "When", "Account", "Type", "Amount", "After", "Description"],
        &rows,
    ));
    Ok(())
}

/// Table rows for `txns`. Running balances are shown in the owning account's currency.
fn listing_rows(records: &[TransactionRecord], accounts: &[Account]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            let owner = accounts
                .iter()
                .find(|account| account.id == record.account_id);
            let account_name = owner
                .map(|account| account.name.clone())
                .unwrap_or_else(|| short_id(record.account_id));
            let balance_currency = owner.map_or(&record.currency, |account| &account.currency);
            vec![
                short_id(record.id),
                record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                account_name,
                record.operation.to_string(),
                format_amount(record.amount, &record.currency),
                format_amount(record.balance_after, balance_currency),
                describe(record),
            ]
        })
        .collect()
}

fn describe(record: &TransactionRecord) -> String {
    let mut text = record.description.clone();
    if !record.category.is_empty() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&format!("[{}]", record.category));
    }
    if record.origin.is_some() {
        text.push_str(" (recurring)");
    }
    text
}

fn cmd_deposit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    record(context, args, OperationKind::Deposit, "deposit")
}

fn cmd_withdraw(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    record(context, args, OperationKind::Withdraw, "withdraw")
}

fn record(
    context: &mut ShellContext,
    args: &[&str],
    operation: OperationKind,
    name: &str,
) -> CommandResult {
    require_args(
        args,
        2,
        &format!("{name} <account> <amount> [YYYY-MM-DD[THH:MM]] [description...]"),
    )?;
    let account = resolve_account(context, args[0])?;
    let amount = parse_amount(args[1])?;
    let (timestamp, rest) = match args.get(2) {
        Some(raw) if looks_like_date(raw) => (parse_timestamp(raw)?, &args[3..]),
        _ => (context.clock.now(), &args[2..]),
    };
    let draft = TransactionDraft::new(account.id, operation, amount, timestamp)
        .with_description(rest.join(" "));
    let created = context.ledger.create(vec![draft])?;
    let balance = context.ledger.account(account.id)?.current_balance;
    for record in created {
        output::success(format!(
            "Recorded {} of {} on {} ({}); balance now {}.",
            record.operation.to_string().to_lowercase(),
            format_amount(record.amount, &record.currency),
            account.name,
            short_id(record.id),
            format_amount(balance, &account.currency)
        ));
    }
    Ok(())
}

fn resolve_transaction(context: &ShellContext, token: &str) -> Result<Uuid, CommandError> {
    let all = context.ledger.list(&TransactionFilter::default(), 1, 0)?;
    match_id(token, all.items.iter().map(|record| record.id), "transaction")
}

fn cmd_set_amount(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 2, "set-amount <transaction> <amount>")?;
    let id = resolve_transaction(context, args[0])?;
    let patch = TransactionPatch {
        amount: Some(parse_amount(args[1])?),
        ..TransactionPatch::default()
    };
    let updated = context.ledger.update(id, patch)?;
    let account = context.ledger.account(updated.account_id)?;
    output::success(format!(
        "Transaction {} now {}; {} balance {}.",
        short_id(updated.id),
        format_amount(updated.amount, &updated.currency),
        account.name,
        format_amount(account.current_balance, &account.currency)
    ));
    Ok(())
}

fn cmd_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "remove-txn <transaction>")?;
    let id = resolve_transaction(context, args[0])?;
    let removed = context.ledger.remove(id)?;
    let account = context.ledger.account(removed.account_id)?;
    output::success(format!(
        "Transaction {} removed; {} balance {}.",
        short_id(removed.id),
        account.name,
        format_amount(account.current_balance, &account.currency)
    ));
    Ok(())
}

fn cmd_duplicate(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "duplicate <transaction>")?;
    let id = resolve_transaction(context, args[0])?;
    let copy = context.ledger.duplicate(id)?;
    output::success(format!(
        "Transaction {} duplicated as {} (\"{}\").",
        short_id(id),
        short_id(copy.id),
        copy.description
    ));
    Ok(())
}
