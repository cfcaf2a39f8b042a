//! OS keychain storage backend (macOS / Windows)
//!
//! Uses the system keychain via the `keyring` crate:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)

use keyring::Entry;
use tracing::debug;

use super::CredentialStore;
use crate::error::{CredentialError, Result};

/// Keychain service name all entries live under
const SERVICE_NAME: &str = "credstore";

/// OS keychain storage backend
///
/// The logical `(service, user)` pair becomes the account string
/// `"<service>:<user>"` under one fixed keychain service, keeping every
/// credential this crate manages in a single namespace.
pub struct KeychainStore;

impl KeychainStore {
    /// Create a new keychain backend
    pub fn new() -> Self {
        Self
    }

    /// Probe whether the keychain accepts writes
    pub fn probe() -> bool {
        match Entry::new(SERVICE_NAME, "__probe__") {
            Ok(entry) => {
                if entry.set_password("probe").is_ok() {
                    let _ = entry.delete_password();
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    fn entry(service: &str, user: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &format!("{service}:{user}"))
            .map_err(|e| CredentialError::Backend(format!("keychain: {e}")))
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        let entry = Self::entry(service, user)?;
        entry
            .set_password(secret)
            .map_err(|e| CredentialError::Backend(format!("keychain: {e}")))?;
        debug!(service, user, "stored credential in keychain");
        Ok(())
    }

    fn get(&self, service: &str, user: &str) -> Result<String> {
        let entry = Self::entry(service, user)?;
        match entry.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Err(CredentialError::NotFound),
            Err(e) => Err(CredentialError::Backend(format!("keychain: {e}"))),
        }
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        let entry = Self::entry(service, user)?;
        match entry.delete_password() {
            Ok(()) => {
                debug!(service, user, "deleted credential from keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Err(CredentialError::NotFound),
            Err(e) => Err(CredentialError::Backend(format!("keychain: {e}"))),
        }
    }

    fn delete_all(&self, service: &str) -> Result<()> {
        if service.is_empty() {
            return Err(CredentialError::NotFound);
        }
        // The keychain cannot enumerate entries, so a service-wide wipe is
        // not expressible here. Failing lets a composite fall through to a
        // backend that can.
        Err(CredentialError::Backend(
            "the OS keychain does not support enumerating entries".to_string(),
        ))
    }
}
