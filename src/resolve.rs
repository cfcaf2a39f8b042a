//! Backend selection at process startup
//!
//! The active backend is resolved exactly once, on first use, and is
//! immutable for the process lifetime. Resolution probes the preferred
//! native mechanism for the platform; when the probe fails, the chain
//! degrades through a composite down to the file-backed store.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::store::{CompositeStore, CredentialStore, FileStore};

static STORE: OnceLock<Box<dyn CredentialStore>> = OnceLock::new();

/// The process-wide credential store
///
/// Resolved on first call; later calls return the same backend. There is
/// no re-probing on transient failure mid-run.
pub fn default_store() -> &'static dyn CredentialStore {
    STORE.get_or_init(resolve).as_ref()
}

#[cfg(target_os = "linux")]
fn resolve() -> Box<dyn CredentialStore> {
    use crate::store::{KeyctlStore, SecretServiceStore};

    match SecretServiceStore::probe() {
        Ok(()) => {
            debug!("using the Secret Service backend");
            Box::new(SecretServiceStore::new())
        }
        Err(e) => {
            warn!(error = %e, "Secret Service unavailable, chaining degraded backends");
            // The unusable primary stays at the head of the chain so a
            // transient bus fault can recover on a later call.
            let kernel = CompositeStore::new(Box::new(KeyctlStore::new()), file_fallback());
            Box::new(CompositeStore::new(
                Box::new(SecretServiceStore::new()),
                Some(Box::new(kernel)),
            ))
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn resolve() -> Box<dyn CredentialStore> {
    use crate::store::KeychainStore;

    if KeychainStore::probe() {
        debug!("using the OS keychain backend");
        Box::new(KeychainStore::new())
    } else {
        warn!("OS keychain unavailable, falling back to file storage");
        Box::new(CompositeStore::new(
            Box::new(KeychainStore::new()),
            file_fallback(),
        ))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn resolve() -> Box<dyn CredentialStore> {
    match FileStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "no credential backend available");
            Box::new(UnavailableStore)
        }
    }
}

fn file_fallback() -> Option<Box<dyn CredentialStore>> {
    match FileStore::new() {
        Ok(store) => Some(Box::new(store)),
        Err(e) => {
            warn!(error = %e, "file-backed fallback unavailable");
            None
        }
    }
}

/// Terminal backend for hosts with no usable mechanism at all
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
struct UnavailableStore;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
impl CredentialStore for UnavailableStore {
    fn set(&self, _service: &str, _user: &str, _secret: &str) -> crate::error::Result<()> {
        Err(crate::error::CredentialError::Unavailable(
            "no credential backend available on this platform".to_string(),
        ))
    }

    fn get(&self, _service: &str, _user: &str) -> crate::error::Result<String> {
        Err(crate::error::CredentialError::Unavailable(
            "no credential backend available on this platform".to_string(),
        ))
    }

    fn delete(&self, _service: &str, _user: &str) -> crate::error::Result<()> {
        Err(crate::error::CredentialError::Unavailable(
            "no credential backend available on this platform".to_string(),
        ))
    }

    fn delete_all(&self, _service: &str) -> crate::error::Result<()> {
        Err(crate::error::CredentialError::Unavailable(
            "no credential backend available on this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_yields_a_usable_backend() {
        // Whatever chain the host resolves to, looking up an identity
        // that was never written must come back as an error, not a panic.
        let store = default_store();
        assert!(store.get("credstore-test-resolve", "nobody").is_err());
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let first = default_store() as *const dyn CredentialStore;
        let second = default_store() as *const dyn CredentialStore;
        assert!(std::ptr::eq(first, second));
    }
}
