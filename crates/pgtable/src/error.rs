//! Error types for pgtable

use thiserror::Error;

/// Result type alias for pgtable operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement preparation or execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Malformed builder input (operators, identifiers, missing table)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A placeholder in the SQL has no bound parameter
    #[error("Missing parameter for placeholder ':{0}'")]
    MissingParam(String),

    /// `retrieve` was asked for an amount it does not know
    #[error("Unsupported keyword for retrieve: '{0}'")]
    UnsupportedKeyword(String),

    /// `retrieve` was called without a pending `select` result
    #[error("No result set: call select() before retrieve()")]
    NoResultSet,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this error came from the database driver (as opposed to the builder).
    pub fn is_driver_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Query(_)
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::CheckViolation(_)
        )
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_errors_are_not_driver_errors() {
        assert!(!DbError::validation("bad operator").is_driver_error());
        assert!(!DbError::MissingParam("id".into()).is_driver_error());
        assert!(DbError::Connection("refused".into()).is_driver_error());
        assert!(DbError::UniqueViolation("users_pkey: dup".into()).is_driver_error());
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = DbError::UnsupportedKeyword("last".into());
        assert_eq!(err.to_string(), "Unsupported keyword for retrieve: 'last'");

        let err = DbError::decode("price", "unsupported type numeric");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'price': unsupported type numeric"
        );
    }
}
