use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};
use crate::ledger::CURRENT_SCHEMA_VERSION;
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "help",
            "Show available commands",
            "help [command]",
            cmd_help,
        )
        .with_args(&[ArgKind::Command]),
        CommandEntry::new("version", "Show build metadata", "version", cmd_version),
        CommandEntry::new(
            "tick",
            "Run one scheduler pass now",
            "tick",
            cmd_tick,
        ),
        CommandEntry::new(
            "start",
            "Start the background scheduler",
            "start",
            cmd_start,
        ),
        CommandEntry::new(
            "stop",
            "Stop the background scheduler",
            "stop",
            cmd_stop,
        ),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.registry.get(&name.to_lowercase()) {
            Some(entry) => {
                output::section(format!("Help: {}", entry.name));
                output::info(format!("  Description: {}", entry.description));
                output::info(format!("  Usage: {}", entry.usage));
            }
            None => context.suggest_command(name),
        }
        return Ok(());
    }

    for (group, entries) in context.registry.grouped() {
        output::section(group.title());
        for entry in entries {
            output::info(format!("  {:<16} {}", entry.name, entry.description));
        }
    }
    output::info("Use `help <command>` for details.");
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("ops_ledger {}", meta.version));
    output::info(format!("  Schema ver   : v{}", CURRENT_SCHEMA_VERSION));
    output::info(format!(
        "  Build hash   : {} ({})",
        meta.git_hash, meta.git_status
    ));
    output::info(format!("  Built at     : {}", meta.timestamp));
    output::info(format!("  Target       : {}", meta.target));
    output::info(format!("  Profile      : {}", meta.profile));
    output::info(format!("  Rustc        : {}", meta.rustc));
    Ok(())
}

fn cmd_tick(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let report = context.scheduler.tick();
    if report.skipped {
        output::warning("A scheduler pass is already running; nothing done.");
        return Ok(());
    }
    output::success(format!(
        "Tick finished: {} fired, {} already recorded, {} rescheduled, {} failed.",
        report.fired, report.deduplicated, report.healed, report.failures
    ));
    Ok(())
}

fn cmd_start(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if context.scheduler_handle.is_some() {
        output::warning("Scheduler already running.");
        return Ok(());
    }
    let handle = context.scheduler.clone().spawn()?;
    context.scheduler_handle = Some(handle);
    output::success(format!(
        "Scheduler started (every {}s).",
        context.scheduler.poll_interval().as_secs()
    ));
    Ok(())
}

fn cmd_stop(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.scheduler_handle.take() {
        Some(handle) => {
            handle.stop();
            output::success("Scheduler stopped.");
        }
        None => output::info("Scheduler is not running."),
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
