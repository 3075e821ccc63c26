use std::collections::HashMap;

use crate::cli::core::{CommandResult, ShellContext};

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// What a positional argument refers to; drives tab completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Account,
    Payment,
    Transaction,
    Command,
    /// Free-form value such as an amount.
    Value,
    /// One of a fixed set of words.
    Keyword(&'static [&'static str]),
}

pub const OPERATION_WORDS: &[&str] = &["deposit", "withdraw"];
pub const CADENCE_WORDS: &[&str] = &["daily", "weekly:", "monthly:", "yearly:"];

/// Section a command is listed under in `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandGroup {
    Accounts,
    Transactions,
    Payments,
    Currency,
    System,
}

impl CommandGroup {
    pub fn title(self) -> &'static str {
        match self {
            CommandGroup::Accounts => "Accounts",
            CommandGroup::Transactions => "Transactions",
            CommandGroup::Payments => "Recurring payments",
            CommandGroup::Currency => "Currency",
            CommandGroup::System => "Shell & scheduler",
        }
    }
}

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub group: CommandGroup,
    pub args: &'static [ArgKind],
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            group: CommandGroup::System,
            args: &[],
            handler,
        }
    }

    pub fn with_args(mut self, args: &'static [ArgKind]) -> Self {
        self.args = args;
        self
    }
}

/// Commands by name, remembering the order groups were registered in.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandEntry>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entries` under `group`; a repeated name replaces the earlier entry.
    pub fn register_group(
        &mut self,
        group: CommandGroup,
        entries: impl IntoIterator<Item = CommandEntry>,
    ) {
        for mut entry in entries {
            entry.group = group;
            let name = entry.name;
            if self.commands.insert(name, entry).is_none() {
                self.order.push(name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// Entries bucketed by group, in registration order.
    pub fn grouped(&self) -> Vec<(CommandGroup, Vec<&CommandEntry>)> {
        let mut groups: Vec<(CommandGroup, Vec<&CommandEntry>)> = Vec::new();
        for entry in self.order.iter().filter_map(|name| self.commands.get(name)) {
            match groups.iter_mut().find(|(group, _)| *group == entry.group) {
                Some((_, entries)) => entries.push(entry),
                None => groups.push((entry.group, vec![entry])),
            }
        }
        groups
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn handler(&self, name: &str) -> Option<CommandHandler> {
        self.commands.get(name).map(|entry| entry.handler)
    }

    /// Kind of the `position`-th argument (0-based, command word excluded).
    pub fn argument_kind(&self, command: &str, position: usize) -> Option<ArgKind> {
        self.commands
            .get(command)
            .and_then(|entry| entry.args.get(position).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ShellContext, _: &[&str]) -> CommandResult {
        Ok(())
    }

    #[test]
    fn groups_keep_registration_order() {
        let mut registry = CommandRegistry::new();
        registry.register_group(
            CommandGroup::Accounts,
            [
                CommandEntry::new("accounts", "", "", noop),
                CommandEntry::new("set-start", "", "", noop).with_args(&[ArgKind::Account]),
            ],
        );
        registry.register_group(
            CommandGroup::System,
            [CommandEntry::new("exit", "", "", noop)],
        );

        let grouped = registry.grouped();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, CommandGroup::Accounts);
        let names: Vec<_> = grouped[0].1.iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["accounts", "set-start"]);
        assert_eq!(registry.argument_kind("set-start", 0), Some(ArgKind::Account));
        assert_eq!(registry.argument_kind("set-start", 1), None);
        assert_eq!(registry.argument_kind("missing", 0), None);
    }
}
