use diesel::result::Error as DieselError;
use thiserror::Error;

use crate::market_data::MarketDataError;
use crate::portfolios::PortfolioError;
use crate::snapshots::SnapshotError;
use crate::splits::SplitError;
use crate::transactions::TransactionError;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Stock split error: {0}")]
    Split(#[from] SplitError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] diesel::result::ConnectionError),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(#[from] r2d2::Error),

    #[error("Database query failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

// Implement From for DieselError to Error directly
impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        Error::Database(DatabaseError::QueryFailed(err))
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::Database(DatabaseError::PoolCreationFailed(e))
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl Error {
    /// True when the error maps to "not found" rather than "bad request"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Portfolio(PortfolioError::NotFound(_))
                | Error::Transaction(TransactionError::NotFound(_))
                | Error::Split(SplitError::NotFound(_))
                | Error::Snapshot(SnapshotError::NotFound(_))
        )
    }
}
