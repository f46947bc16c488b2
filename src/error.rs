use serde::Serialize;
use thiserror::Error;

/// Error types shared by the reminder core and the CLI.
#[derive(Debug, Clone, Serialize, Error)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Reading or writing the reminder store failed
    #[error("Storage error: {0}")]
    Storage(String),
    /// Registering or cancelling an alarm failed
    #[error("Scheduler error: {0}")]
    Scheduler(String),
    /// Raising or clearing a notification failed
    #[error("Notifier error: {0}")]
    Notifier(String),
    /// A record, rule or user input is malformed
    #[error("Validation error: {0}")]
    Validation(String),
    /// The requested reminder or category does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Settings or data directory could not be resolved
    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn scheduler<S: Into<String>>(msg: S) -> Self {
        AppError::Scheduler(msg.into())
    }

    pub fn notifier<S: Into<String>>(msg: S) -> Self {
        AppError::Notifier(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        AppError::Config(msg.into())
    }

    /// Transient failures are retried on the next trigger; everything else
    /// needs the record or input to change first.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_) | AppError::Scheduler(_) | AppError::Notifier(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
