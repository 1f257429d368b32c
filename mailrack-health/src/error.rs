//! Health server error types.

use thiserror::Error;

/// Errors that can occur while running the health server.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Failed to bind to the specified address.
    #[error("Failed to bind health server to {address}: {source}")]
    BindError {
        /// Address that could not be bound.
        address: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The server encountered a runtime error.
    #[error("Health server error: {0}")]
    ServerError(String),
}
