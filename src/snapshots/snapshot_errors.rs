use diesel::result::Error as DieselError;
use thiserror::Error;

/// Custom error type for snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<DieselError> for SnapshotError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => SnapshotError::NotFound("Record not found".to_string()),
            _ => SnapshotError::DatabaseError(err.to_string()),
        }
    }
}
