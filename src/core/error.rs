use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistroError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to initialize database: {0}")]
    DatabaseInitializationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate documento_id: {0}")]
    DuplicateDocument(String),
    #[error("Duplicate username: {0}")]
    DuplicateIdentity(String),
    #[error("Unknown responsible party: {0}")]
    UnknownResponsible(String),
    #[error("Quantity must be non-negative, got {0}")]
    InvalidQuantity(i64),
    #[error("Transition to assistance requires responsavel_assistencia")]
    MissingAssistanceOwner,
    #[error("Record is in a terminal state: {0}")]
    TerminalStateViolation(String),
    #[error("Record already finalized: {0}")]
    AlreadyFinalized(String),
    #[error("Monthly total {informed} is below the recorded daily sum {daily_sum}")]
    MonthlyBelowDailySum { informed: i64, daily_sum: i64 },
    #[error("Write conflict after bounded retries: {0}")]
    Conflict(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}
