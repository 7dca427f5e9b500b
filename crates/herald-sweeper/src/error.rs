//! Error types for the sweeper daemon.
//!
//! [`SweeperError`] is the top-level error type that wraps every failure
//! mode during startup.

/// Top-level error for the sweeper daemon.
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: herald_core::ConfigError,
    },

    /// Connecting to or migrating the event store failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying data layer error.
        #[from]
        source: herald_db::DbError,
    },

    /// The sweeper rejected its settings.
    #[error("sweeper error: {source}")]
    Sweep {
        /// The underlying sweep error.
        #[from]
        source: herald_core::SweepError,
    },

    /// The log filter could not be built.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
