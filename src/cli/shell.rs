use std::{
    collections::HashMap,
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    history::DefaultHistory,
    Cmd, Context as ReadlineContext, Editor, Helper, Highlighter, Hinter, KeyEvent, Validator,
};
use shell_words::split;

use crate::cli::commands::short_id;
use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;
use crate::cli::registry::ArgKind;
use crate::ledger::TransactionFilter;

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os("OPS_LEDGER_CLI_SCRIPT").is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };
    output::set_plain(mode == CliMode::Script);

    let mut context = ShellContext::new(mode)?;

    let result = match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    };
    context.shutdown();
    result
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<LedgerHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(LedgerHelper::default()));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    while context.running {
        // Accounts, payments and transactions change between prompts.
        if let Some(helper) = editor.helper_mut() {
            helper.catalog = CompletionCatalog::capture(context);
        }

        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();

                match handle_line(context, trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                output::hint("Input cleared. Type `exit` or press Ctrl-D to leave.");
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        match handle_line(context, &line?) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(())
}

/// Runs one shell line. Blank lines and `#` comments are skipped.
pub(crate) fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(LoopControl::Continue);
    }
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(&err.message);
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    match context.dispatch(&raw.to_lowercase(), raw, &args) {
        Ok(LoopControl::Exit) => {
            context.running = false;
            Ok(LoopControl::Exit)
        }
        other => other,
    }
}

/// Names the completer can offer, refreshed from the ledger before each prompt.
#[derive(Debug, Default, Clone)]
struct CompletionCatalog {
    commands: Vec<String>,
    arguments: HashMap<String, Vec<ArgKind>>,
    accounts: Vec<String>,
    payments: Vec<String>,
    transactions: Vec<String>,
}

impl CompletionCatalog {
    fn capture(context: &ShellContext) -> Self {
        let mut commands: Vec<String> = context.registry.names().map(str::to_owned).collect();
        commands.sort();
        let arguments = context
            .registry
            .names()
            .filter_map(|name| context.registry.get(name))
            .map(|entry| (entry.name.to_owned(), entry.args.to_vec()))
            .collect();

        let accounts = context
            .ledger
            .accounts()
            .map(|accounts| accounts.into_iter().map(|account| account.name).collect())
            .unwrap_or_default();
        let payments = context
            .payments
            .list_all()
            .map(|payments| payments.into_iter().map(|p| short_id(p.id)).collect())
            .unwrap_or_default();
        let transactions = context
            .ledger
            .list(&TransactionFilter::default(), 1, 0)
            .map(|page| page.items.into_iter().map(|r| short_id(r.id)).collect())
            .unwrap_or_default();

        Self {
            commands,
            arguments,
            accounts,
            payments,
            transactions,
        }
    }

    /// Start of the word under the cursor plus the replacements for it.
    fn complete(&self, prefix: &str) -> (usize, Vec<String>) {
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let needle = prefix[start..].trim_start_matches('"').to_lowercase();
        let before: Vec<&str> = prefix[..start].split_whitespace().collect();

        let options: Vec<String> = match before.split_first() {
            None => self.commands.clone(),
            Some((command, args)) => {
                let kind = self
                    .arguments
                    .get(&command.to_lowercase())
                    .and_then(|kinds| kinds.get(args.len()).copied());
                match kind {
                    Some(ArgKind::Account) => self.accounts.iter().map(|name| quoted(name)).collect(),
                    Some(ArgKind::Payment) => self.payments.clone(),
                    Some(ArgKind::Transaction) => self.transactions.clone(),
                    Some(ArgKind::Command) => self.commands.clone(),
                    Some(ArgKind::Keyword(words)) => words.iter().map(|w| (*w).to_owned()).collect(),
                    Some(ArgKind::Value) | None => Vec::new(),
                }
            }
        };

        let matches = options
            .into_iter()
            .filter(|option| {
                option
                    .trim_start_matches('"')
                    .to_lowercase()
                    .starts_with(&needle)
            })
            .collect();
        (start, matches)
    }
}

fn quoted(name: &str) -> String {
    if name.contains(char::is_whitespace) {
        format!("\"{name}\"")
    } else {
        name.to_owned()
    }
}

#[derive(Default, Helper, Hinter, Highlighter, Validator)]
struct LedgerHelper {
    catalog: CompletionCatalog,
}

impl Completer for LedgerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.catalog.complete(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((start, pairs))
    }
}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::registry::{CADENCE_WORDS, OPERATION_WORDS};

    fn catalog() -> CompletionCatalog {
        let arguments = [
            ("deposit", vec![ArgKind::Account]),
            ("pause", vec![ArgKind::Payment]),
            ("remove-txn", vec![ArgKind::Transaction]),
            (
                "add-payment",
                vec![
                    ArgKind::Account,
                    ArgKind::Keyword(OPERATION_WORDS),
                    ArgKind::Value,
                    ArgKind::Keyword(CADENCE_WORDS),
                ],
            ),
        ]
        .into_iter()
        .map(|(name, kinds)| (name.to_owned(), kinds))
        .collect();
        CompletionCatalog {
            commands: vec!["add-payment".into(), "deposit".into(), "duplicate".into(), "pause".into()],
            arguments,
            accounts: vec!["Ops".into(), "Petty cash".into()],
            payments: vec!["3f2a9c10".into(), "7be01d44".into()],
            transactions: vec!["a1b2c3d4".into()],
        }
    }

    #[test]
    fn first_word_completes_commands() {
        let (start, matches) = catalog().complete("d");
        assert_eq!(start, 0);
        assert_eq!(matches, vec!["deposit", "duplicate"]);
    }

    #[test]
    fn account_names_are_quoted_when_needed() {
        let (start, matches) = catalog().complete("deposit p");
        assert_eq!(start, 8);
        assert_eq!(matches, vec!["\"Petty cash\""]);
    }

    #[test]
    fn ids_complete_by_prefix() {
        assert_eq!(catalog().complete("pause 7").1, vec!["7be01d44"]);
        assert_eq!(catalog().complete("remove-txn ").1, vec!["a1b2c3d4"]);
    }

    #[test]
    fn positional_keywords_follow_the_command() {
        let catalog = catalog();
        assert_eq!(catalog.complete("add-payment Ops w").1, vec!["withdraw"]);
        assert!(catalog.complete("add-payment Ops withdraw 1").1.is_empty());
        assert_eq!(
            catalog.complete("add-payment Ops withdraw 10 m").1,
            vec!["monthly:"]
        );
        assert!(catalog.complete("unknown x").1.is_empty());
    }

    #[test]
    fn quoted_arguments_stay_together() {
        let tokens = parse_command_line(r#"open-account "Petty cash" EUR 50"#).unwrap();
        assert_eq!(tokens, vec!["open-account", "Petty cash", "EUR", "50"]);
    }

    #[test]
    fn unbalanced_quotes_are_reported() {
        assert!(parse_command_line(r#"deposit "Ops 10"#).is_err());
    }
}
