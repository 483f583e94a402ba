use std::result::Result as StdResult;

use kharch_config::ConfigError;
use kharch_core::CoreError;
use thiserror::Error;

/// Unified error type for the domain, settlement, config and storage layers.
#[derive(Error, Debug)]
pub enum KharchError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),
    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = StdResult<T, KharchError>;

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] KharchError),
    #[error("{0}")]
    Usage(String),
}

impl From<std::io::Error> for KharchError {
    fn from(err: std::io::Error) -> Self {
        KharchError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for KharchError {
    fn from(err: serde_json::Error) -> Self {
        KharchError::StorageError(err.to_string())
    }
}

impl From<CoreError> for KharchError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ExpenseNotFound(id) => KharchError::ExpenseNotFound(id.to_string()),
            CoreError::ParticipantNotFound(name) => KharchError::ParticipantNotFound(name),
            CoreError::Storage(message) | CoreError::Serde(message) => {
                KharchError::StorageError(message)
            }
            CoreError::InvalidOperation(message) | CoreError::Validation(message) => {
                KharchError::InvalidInput(message)
            }
            CoreError::Io(err) => KharchError::StorageError(err.to_string()),
        }
    }
}

impl From<ConfigError> for KharchError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => KharchError::StorageError(io.to_string()),
            ConfigError::Serde(message) => KharchError::ConfigError(message),
            invalid @ ConfigError::Invalid { .. } => KharchError::ConfigError(invalid.to_string()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::from(KharchError::from(err))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::from(KharchError::from(err))
    }
}
