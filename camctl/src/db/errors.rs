use thiserror::Error;

/// Unified error type for inventory operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// A stored row could not be turned into a typed record
    #[error("Invalid record in column {column}: {message}")]
    InvalidRecord { column: String, message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { index, source } => DbError::InvalidRecord {
                column: index,
                message: source.to_string(),
            },
            sqlx::Error::ColumnNotFound(column) => DbError::InvalidRecord {
                column,
                message: "column missing from result set".to_string(),
            },
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            other => DbError::Other(anyhow::Error::from(other)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
