//! Error types for the data layer.
//!
//! Connection-level `sqlx` failures (pool exhaustion, closed pool, socket
//! errors) surface as [`DbError::Unavailable`]; everything else the
//! database reports stays a [`DbError::Postgres`].

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` statement failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row does not match the event record schema.
    #[error("Malformed event row {id}: {reason}")]
    MalformedRow {
        /// ID of the offending row.
        id: uuid::Uuid,
        /// What is wrong with it.
        reason: String,
    },

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            other => Self::Postgres(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_are_unavailable() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::Unavailable(_)
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::Unavailable(_)
        ));
    }

    #[test]
    fn statement_failures_stay_postgres_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::Postgres(_)
        ));
    }
}
