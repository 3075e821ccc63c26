use std::{io, sync::Arc};

use strsim::levenshtein;

use crate::{
    config::{Config, ConfigError, ConfigManager, StorageKind},
    core::{
        services::PaymentRegistry,
        time::{Clock, SystemClock},
    },
    currency::RateBoard,
    errors::LedgerError,
    ledger::TransactionLedger,
    scheduler::{SchedulerHandle, SchedulerLoop},
    storage::{InMemoryStore, JsonStorage, LedgerStore, PaymentStore},
};

use super::commands;
use super::output;
use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("exit requested")]
    ExitRequested,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Command(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

/// Wiring shared by every command: ledger, registry, scheduler and rates.
pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub rates: Arc<RateBoard>,
    pub ledger: Arc<TransactionLedger>,
    pub payments: Arc<PaymentRegistry>,
    pub scheduler: Arc<SchedulerLoop>,
    pub scheduler_handle: Option<SchedulerHandle>,
    pub storage: Option<Arc<JsonStorage>>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let rates = Arc::new(RateBoard::new());

        let payment_store: Arc<dyn PaymentStore>;
        let ledger_store: Arc<dyn LedgerStore>;
        let mut storage = None;
        match config.storage {
            StorageKind::Json => {
                let json = Arc::new(JsonStorage::new(config_manager.data_dir(&config))?);
                if let Some(snapshot) = json.load_rates()? {
                    rates.publish(snapshot);
                }
                payment_store = json.clone();
                ledger_store = json.clone();
                storage = Some(json);
            }
            StorageKind::Memory => {
                let memory = Arc::new(InMemoryStore::new());
                payment_store = memory.clone();
                ledger_store = memory;
            }
        }

        let ledger = Arc::new(
            TransactionLedger::open(ledger_store, clock.clone())?
                .with_rates(rates.clone())
                .with_reporting_currencies(config.reporting_currencies()),
        );
        let payments = Arc::new(PaymentRegistry::new(payment_store, clock.clone()));
        let scheduler = Arc::new(SchedulerLoop::new(
            payments.clone(),
            ledger.clone(),
            clock.clone(),
            config.poll_interval(),
        ));

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        Ok(Self {
            mode,
            registry,
            config,
            clock,
            rates,
            ledger,
            payments,
            scheduler,
            scheduler_handle: None,
            storage,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        if self.scheduler_handle.is_some() {
            "ops-ledger [scheduler on]> ".into()
        } else {
            "ops-ledger> ".into()
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let best = self
            .registry
            .names()
            .map(|key| (levenshtein(key, input), key))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Ledger(err) if err.is_transient() => {
                output::error(format!("{err}. Nothing was changed; try again."));
                Ok(())
            }
            other => {
                output::error(other);
                Ok(())
            }
        }
    }

    /// Stops the background scheduler if it is running.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.scheduler_handle.take() {
            handle.stop();
        }
    }
}

impl Drop for ShellContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
