use diesel::result::Error as DieselError;
use thiserror::Error;

/// Custom error type for stock-split operations
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid split ratio: {0}")]
    InvalidRatio(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<DieselError> for SplitError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => SplitError::NotFound("Record not found".to_string()),
            _ => SplitError::DatabaseError(err.to_string()),
        }
    }
}
