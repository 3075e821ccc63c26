use uuid::Uuid;

use crate::cli::commands::{
    match_id, parse_amount, parse_cadence, parse_operation, parse_time, require_args,
    resolve_account, short_id,
};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry, CADENCE_WORDS, OPERATION_WORDS};
use crate::currency::format_amount;
use crate::ledger::{PaymentDraft, PaymentStatus, Schedule};

const ADD_USAGE: &str = "add-payment <account> <deposit|withdraw> <amount> <daily|weekly:N|monthly:D|yearly:D-M> <HH:MM> <category> [description...]";
const ADD_ARGS: &[ArgKind] = &[
    ArgKind::Account,
    ArgKind::Keyword(OPERATION_WORDS),
    ArgKind::Value,
    ArgKind::Keyword(CADENCE_WORDS),
];
const RESCHEDULE_ARGS: &[ArgKind] = &[ArgKind::Payment, ArgKind::Keyword(CADENCE_WORDS)];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "payments",
            "List recurring payments",
            "payments",
            cmd_list,
        ),
        CommandEntry::new(
            "add-payment",
            "Create a recurring payment",
            ADD_USAGE,
            cmd_add,
        )
        .with_args(ADD_ARGS),
        CommandEntry::new(
            "reschedule",
            "Change when a recurring payment fires",
            "reschedule <payment> <daily|weekly:N|monthly:D|yearly:D-M> <HH:MM>",
            cmd_reschedule,
        )
        .with_args(RESCHEDULE_ARGS),
        CommandEntry::new(
            "pause",
            "Stop a recurring payment from firing",
            "pause <payment>",
            cmd_pause,
        )
        .with_args(&[ArgKind::Payment]),
        CommandEntry::new(
            "resume",
            "Resume a paused recurring payment from now",
            "resume <payment>",
            cmd_resume,
        )
        .with_args(&[ArgKind::Payment]),
        CommandEntry::new(
            "remove-payment",
            "Delete a recurring payment",
            "remove-payment <payment>",
            cmd_remove,
        )
        .with_args(&[ArgKind::Payment]),
    ]
}

fn resolve_payment(context: &ShellContext, token: &str) -> Result<Uuid, CommandError> {
    let payments = context.payments.list_all()?;
    match_id(token, payments.iter().map(|payment| payment.id), "payment")
}

fn cmd_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let payments = context.payments.list_all()?;
    if payments.is_empty() {
        output::info("No recurring payments defined.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = payments
        .iter()
        .map(|payment| {
            vec![
                short_id(payment.id),
                payment.category.clone(),
                payment.operation.to_string(),
                format_amount(payment.amount, &payment.currency),
                payment.schedule.label(),
                payment.status.to_string(),
                payment
                    .next_occurrence_at
                    .map(|next| next.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    output::section("Recurring payments");
    output::plain(output::render_table(
        &["ID", "Category", "Type", "Amount", "Schedule", "Status", "Next"],
        &rows,
    ));
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 6, ADD_USAGE)?;
    let account = resolve_account(context, args[0])?;
    let schedule = Schedule::new(parse_cadence(args[3])?, parse_time(args[4])?);
    let draft = PaymentDraft {
        category: args[5].to_string(),
        subcategory: None,
        description: args[6..].join(" "),
        account_id: account.id,
        currency: account.currency.clone(),
        operation: parse_operation(args[1])?,
        amount: parse_amount(args[2])?,
        schedule,
    };
    let payment = context.payments.create(draft)?;
    output::success(format!(
        "Recurring payment {} created: {} {} {}.",
        short_id(payment.id),
        payment.operation.to_string().to_lowercase(),
        format_amount(payment.amount, &payment.currency),
        payment.schedule.label()
    ));
    if let Some(next) = payment.next_occurrence_at {
        output::info(format!("Next occurrence: {}", next.format("%Y-%m-%d %H:%M")));
    }
    Ok(())
}

fn cmd_reschedule(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(
        args,
        3,
        "reschedule <payment> <daily|weekly:N|monthly:D|yearly:D-M> <HH:MM>",
    )?;
    let id = resolve_payment(context, args[0])?;
    let schedule = Schedule::new(parse_cadence(args[1])?, parse_time(args[2])?);
    let payment = context.payments.reschedule(id, schedule)?;
    output::success(format!(
        "Payment {} now runs {}.",
        short_id(payment.id),
        payment.schedule.label()
    ));
    Ok(())
}

fn cmd_pause(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    set_status(context, args, PaymentStatus::Paused, "pause <payment>")
}

fn cmd_resume(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    set_status(context, args, PaymentStatus::Active, "resume <payment>")
}

fn set_status(
    context: &mut ShellContext,
    args: &[&str],
    status: PaymentStatus,
    usage: &str,
) -> CommandResult {
    require_args(args, 1, usage)?;
    let id = resolve_payment(context, args[0])?;
    let payment = context.payments.set_status(id, status)?;
    output::success(format!(
        "Payment {} is now {}.",
        short_id(payment.id),
        payment.status.to_string().to_lowercase()
    ));
    Ok(())
}

fn cmd_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "remove-payment <payment>")?;
    let id = resolve_payment(context, args[0])?;
    context.payments.remove(id)?;
    output::success(format!("Payment {} removed.", short_id(id)));
    Ok(())
}
