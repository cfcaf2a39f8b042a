//! Kernel keyring storage backend (Linux)
//!
//! Stores secrets as "user"-type keys in the caller's persistent keyring.
//! The persistent keyring is created on demand and expires per kernel
//! policy, outside this crate's control.

use std::process::Command;

use linux_keyutils::{KeyError, KeyRing, KeyRingIdentifier};
use tracing::debug;

use super::CredentialStore;
use crate::error::{CredentialError, Result};

/// Kernel keyring storage backend
///
/// Keys are named `"<service>:<user>"`. Kernel keys are immutable once
/// created, so an update unlinks the old key and adds a fresh one.
pub struct KeyctlStore {
    lister: Box<dyn KeyctlList>,
}

/// Enumeration of the persistent keyring's contents
///
/// The kernel has no in-process primitive for listing keys by description
/// prefix, so `delete_all` depends on an external listing. Injectable so
/// tests can substitute a deterministic listing for the real `keyctl`
/// invocation.
pub(crate) trait KeyctlList: Send + Sync {
    /// Raw `keyctl show` output for the persistent keyring, or `None`
    /// when the listing cannot be obtained.
    fn show_persistent(&self) -> Option<String>;
}

/// Production lister shelling out to the `keyctl` binary
struct KeyctlCommand;

impl KeyctlList for KeyctlCommand {
    fn show_persistent(&self) -> Option<String> {
        let id = Command::new("keyctl")
            .args(["get_persistent", "@s"])
            .output()
            .ok()
            .filter(|out| out.status.success())?;
        let id = String::from_utf8_lossy(&id.stdout).trim().to_string();

        let show = Command::new("keyctl")
            .args(["show", &id])
            .output()
            .ok()
            .filter(|out| out.status.success())?;
        Some(String::from_utf8_lossy(&show.stdout).into_owned())
    }
}

impl KeyctlStore {
    /// Create a new kernel keyring backend
    pub fn new() -> Self {
        Self {
            lister: Box::new(KeyctlCommand),
        }
    }

    #[cfg(test)]
    fn with_lister(lister: Box<dyn KeyctlList>) -> Self {
        Self { lister }
    }

    /// Get or create the persistent keyring for the current user
    fn persistent_keyring() -> Result<KeyRing> {
        KeyRing::get_persistent(KeyRingIdentifier::Session)
            .map_err(|e| CredentialError::Unavailable(format!("persistent keyring: {e}")))
    }

    fn key_name(service: &str, user: &str) -> String {
        format!("{service}:{user}")
    }
}

impl Default for KeyctlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyctlStore {
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        if secret.is_empty() {
            // The kernel treats a zero-length payload as invalid input.
            return Err(CredentialError::InvalidSecret(
                "the kernel keyring rejects empty secrets".to_string(),
            ));
        }

        let ring = Self::persistent_keyring()?;
        let name = Self::key_name(service, user);

        // Kernel keys cannot be overwritten in place.
        if let Ok(existing) = ring.search(&name) {
            let _ = ring.unlink_key(existing);
        }

        ring.add_key(&name, secret.as_bytes()).map_err(backend)?;
        debug!(service, user, "stored credential in kernel keyring");
        Ok(())
    }

    fn get(&self, service: &str, user: &str) -> Result<String> {
        let ring = Self::persistent_keyring()?;

        let key = match ring.search(&Self::key_name(service, user)) {
            Ok(key) => key,
            Err(KeyError::KeyDoesNotExist) => return Err(CredentialError::NotFound),
            Err(e) => return Err(backend(e)),
        };

        let data = key.read_to_vec().map_err(backend)?;
        String::from_utf8(data)
            .map_err(|_| CredentialError::Backend("stored secret is not valid UTF-8".to_string()))
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        let ring = Self::persistent_keyring()?;

        let key = match ring.search(&Self::key_name(service, user)) {
            Ok(key) => key,
            Err(KeyError::KeyDoesNotExist) => return Err(CredentialError::NotFound),
            Err(e) => return Err(backend(e)),
        };

        ring.unlink_key(key).map_err(backend)?;
        debug!(service, user, "deleted credential from kernel keyring");
        Ok(())
    }

    fn delete_all(&self, service: &str) -> Result<()> {
        if service.is_empty() {
            return Err(CredentialError::NotFound);
        }

        // Best-effort: a failed listing reads as "nothing to delete"
        // rather than an error, favoring availability.
        let Some(listing) = self.lister.show_persistent() else {
            debug!(service, "keyring listing unavailable, nothing to delete");
            return Ok(());
        };

        let prefix = format!("{service}:");
        let matches: Vec<String> = parse_user_key_descriptions(&listing)
            .into_iter()
            .filter(|desc| desc.starts_with(&prefix))
            .collect();

        if matches.is_empty() {
            return Ok(());
        }

        let ring = Self::persistent_keyring()?;
        for desc in &matches {
            if let Ok(key) = ring.search(desc) {
                let _ = ring.unlink_key(key);
            }
        }

        debug!(service, count = matches.len(), "deleted service credentials from kernel keyring");
        Ok(())
    }
}

/// Extract the descriptions of "user"-type keys from `keyctl show` output
fn parse_user_key_descriptions(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_once("user:"))
        .map(|(_, desc)| desc.trim().to_string())
        .filter(|desc| !desc.is_empty())
        .collect()
}

fn backend(e: KeyError) -> CredentialError {
    CredentialError::Backend(format!("kernel keyring: {e}"))
}
