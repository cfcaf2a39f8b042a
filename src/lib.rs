//! # credstore
//!
//! Cross-platform credential storage including:
//! - Native backends: Secret Service and kernel keyring on Linux, the OS
//!   keychain on macOS and Windows
//! - A file-backed store of last resort
//! - Composite chaining with graceful degradation, resolved once at
//!   process startup
//!
//! The top-level functions operate on a process-wide backend chosen by
//! probing the preferred native mechanism:
//!
//! ```no_run
//! credstore::set("my-app", "alice", "s3cret")?;
//! let secret = credstore::get("my-app", "alice")?;
//! credstore::delete("my-app", "alice")?;
//! # Ok::<(), credstore::CredentialError>(())
//! ```
//!
//! Embedders that need a custom chain can compose the concrete backends
//! through [`CredentialStore`] and [`CompositeStore`] directly.

pub mod error;
pub mod store;
mod resolve;

pub use error::{CredentialError, Result};
pub use resolve::default_store;
pub use store::{CompositeStore, CredentialStore, FileStore};

#[cfg(target_os = "linux")]
pub use store::{KeyctlStore, SecretServiceStore};

#[cfg(any(target_os = "macos", target_os = "windows"))]
pub use store::KeychainStore;

/// Store a secret for the given service and user
pub fn set(service: &str, user: &str, secret: &str) -> Result<()> {
    default_store().set(service, user, secret)
}

/// Retrieve the secret for the given service and user
pub fn get(service: &str, user: &str) -> Result<String> {
    default_store().get(service, user)
}

/// Delete the credential for the given service and user
pub fn delete(service: &str, user: &str) -> Result<()> {
    default_store().delete(service, user)
}

/// Delete every credential stored under the given service
pub fn delete_all(service: &str) -> Result<()> {
    default_store().delete_all(service)
}
