//! Error types for credstore

use thiserror::Error;

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Credential storage error types
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No credential matches the requested `(service, user)` identity.
    ///
    /// Also returned by `delete_all` when the service argument is empty:
    /// an unscoped service must never wipe a whole store, so "nothing to
    /// scope the deletion to" is reported as "nothing found to delete".
    #[error("credential not found")]
    NotFound,

    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A persisted token document failed to parse. Never silently reset -
    /// discarding a corrupt store would destroy the user's other credentials.
    #[error("credential store is corrupt: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CredentialError {
    /// Whether this is the `NotFound` sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CredentialError::NotFound)
    }
}
