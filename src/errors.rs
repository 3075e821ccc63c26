use thiserror::Error;
use uuid::Uuid;

/// Error type shared by the recurrence, ledger, registry, and storage layers.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Recurring payment not found: {0}")]
    PaymentNotFound(Uuid),
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),
    #[error("Persistence error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    /// Storage failures may succeed on retry; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
