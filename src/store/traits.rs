//! Storage trait definitions

use crate::error::Result;

/// Trait for credential storage backends
///
/// A credential is identified by the `(service, user)` pair; within one
/// backend that pair maps to at most one stored secret. `set` on an
/// existing identity overwrites the previous value.
pub trait CredentialStore: Send + Sync {
    /// Store a secret for the given service and user
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()>;

    /// Retrieve the secret for the given service and user
    fn get(&self, service: &str, user: &str) -> Result<String>;

    /// Delete the credential for the given service and user
    fn delete(&self, service: &str, user: &str) -> Result<()>;

    /// Delete every credential stored under the given service
    ///
    /// Deleting a service with no credentials is a no-op, not an error;
    /// an empty service string is rejected with `NotFound`.
    fn delete_all(&self, service: &str) -> Result<()>;
}
