//! Secret Service storage backend (Linux)
//!
//! Talks to the session D-Bus secret management service (GNOME Keyring,
//! KWallet) through the `secret-service` crate. Every operation opens its
//! own connection and drops it on return, so concurrent callers never
//! share a session.

use std::collections::HashMap;

use secret_service::blocking::{Collection, Item, SecretService};
use secret_service::{EncryptionType, Error as SsError};
use tracing::debug;

use super::CredentialStore;
use crate::error::{CredentialError, Result};

/// Secret Service storage backend
///
/// Items are tagged with `{"service", "username"}` attributes and a
/// human-readable label. The backend replaces on attribute match, so an
/// update never leaves duplicate items behind.
pub struct SecretServiceStore;

impl SecretServiceStore {
    /// Create a new Secret Service backend
    pub fn new() -> Self {
        Self
    }

    /// Probe whether a Secret Service is reachable on the session bus
    pub fn probe() -> Result<()> {
        Self::connect()?;
        Ok(())
    }

    fn connect() -> Result<SecretService<'static>> {
        SecretService::connect(EncryptionType::Dh)
            .map_err(|e| CredentialError::Unavailable(format!("secret service: {e}")))
    }

    /// Resolve and unlock the default collection
    fn unlocked_collection<'a>(ss: &'a SecretService<'a>) -> Result<Collection<'a>> {
        let collection = ss.get_default_collection().map_err(backend)?;
        if collection.is_locked().map_err(backend)? {
            collection.unlock().map_err(backend)?;
        }
        Ok(collection)
    }

    /// Find the single item matching `(service, user)`
    ///
    /// The first match is canonical if the backend somehow holds
    /// duplicate attribute sets.
    fn find_item<'a>(
        collection: &'a Collection<'a>,
        service: &str,
        user: &str,
    ) -> Result<Item<'a>> {
        let attributes = HashMap::from([("service", service), ("username", user)]);
        let mut items = collection.search_items(attributes).map_err(backend)?;
        if items.is_empty() {
            return Err(CredentialError::NotFound);
        }
        Ok(items.remove(0))
    }
}

impl Default for SecretServiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for SecretServiceStore {
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        let ss = Self::connect()?;
        let collection = Self::unlocked_collection(&ss)?;

        let label = format!("Password for '{user}' on '{service}'");
        let attributes = HashMap::from([("service", service), ("username", user)]);

        collection
            .create_item(&label, attributes, secret.as_bytes(), true, "text/plain")
            .map_err(backend)?;

        debug!(service, user, "stored credential in secret service");
        Ok(())
    }

    fn get(&self, service: &str, user: &str) -> Result<String> {
        let ss = Self::connect()?;
        let collection = Self::unlocked_collection(&ss)?;
        let item = Self::find_item(&collection, service, user)?;

        if item.is_locked().map_err(backend)? {
            item.unlock().map_err(backend)?;
        }

        let secret = item.get_secret().map_err(backend)?;
        String::from_utf8(secret)
            .map_err(|_| CredentialError::Backend("stored secret is not valid UTF-8".to_string()))
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        let ss = Self::connect()?;
        let collection = Self::unlocked_collection(&ss)?;
        let item = Self::find_item(&collection, service, user)?;

        item.delete().map_err(backend)?;
        debug!(service, user, "deleted credential from secret service");
        Ok(())
    }

    fn delete_all(&self, service: &str) -> Result<()> {
        if service.is_empty() {
            return Err(CredentialError::NotFound);
        }

        let ss = Self::connect()?;
        let collection = Self::unlocked_collection(&ss)?;

        // Match on the service attribute alone; zero matches is success.
        let attributes = HashMap::from([("service", service)]);
        let items = collection.search_items(attributes).map_err(backend)?;

        let count = items.len();
        for item in items {
            item.delete().map_err(backend)?;
        }

        debug!(service, count, "deleted service credentials from secret service");
        Ok(())
    }
}

fn backend(e: SsError) -> CredentialError {
    CredentialError::Backend(format!("secret service: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_all_empty_service_is_rejected() {
        // Rejected before any bus connection is attempted.
        let store = SecretServiceStore::new();
        assert!(store.delete_all("").unwrap_err().is_not_found());
    }

    // Exercising the real backend needs a session bus with a running
    // secret service, so these only run in a desktop environment.
    #[test]
    #[ignore = "requires a D-Bus Secret Service"]
    fn round_trip_against_live_service() {
        let store = SecretServiceStore::new();
        let service = "credstore-test-secret-service";

        let _ = store.delete(service, "alice");

        store.set(service, "alice", "s3cret").unwrap();
        assert_eq!(store.get(service, "alice").unwrap(), "s3cret");

        store.set(service, "alice", "updated").unwrap();
        assert_eq!(store.get(service, "alice").unwrap(), "updated");

        store.delete(service, "alice").unwrap();
        assert!(store.get(service, "alice").unwrap_err().is_not_found());
    }

    #[test]
    #[ignore = "requires a D-Bus Secret Service"]
    fn delete_all_scopes_to_service() {
        let store = SecretServiceStore::new();
        let service = "credstore-test-ss-deleteall";

        store.set(service, "u1", "a").unwrap();
        store.set(service, "u2", "b").unwrap();
        store.set("credstore-test-ss-other", "u1", "c").unwrap();

        store.delete_all(service).unwrap();

        assert!(store.get(service, "u1").unwrap_err().is_not_found());
        assert!(store.get(service, "u2").unwrap_err().is_not_found());
        assert_eq!(store.get("credstore-test-ss-other", "u1").unwrap(), "c");

        store.delete_all("credstore-test-ss-other").unwrap();
    }
}
