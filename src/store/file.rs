//! File-backed storage backend (fallback of last resort)
//!
//! Stores all credentials in a single JSON document in the user's config
//! directory, keyed by `"<service>:<user>"`. Secrets are held in plain
//! text, so the document and its directory are restricted to the owning
//! user.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use super::CredentialStore;
use crate::error::{CredentialError, Result};

/// Token document file name
const TOKEN_FILE: &str = "tokens.json";

/// File-backed storage backend
///
/// Read-modify-write on the shared document is not synchronized at this
/// layer: concurrent `set`/`delete` from independent processes can race
/// and lose updates. The document itself is rewritten atomically via a
/// temp file and rename, so a crash mid-write never leaves a torn file.
pub struct FileStore {
    /// Path of the token document
    path: PathBuf,
}

impl FileStore {
    /// Create a file store rooted in the user's config directory
    pub fn new() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "credstore").ok_or_else(|| {
            CredentialError::Backend("could not determine config directory".to_string())
        })?;
        Ok(Self {
            path: dirs.config_dir().join(TOKEN_FILE),
        })
    }

    /// Create a file store with a custom document path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the token document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn token_key(service: &str, user: &str) -> String {
        format!("{service}:{user}")
    }

    /// Load the token document. Absent file reads as `None`; a present
    /// but unparsable document is a hard error.
    fn read_tokens(&self) -> Result<Option<BTreeMap<String, String>>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tokens = serde_json::from_slice(&data)
            .map_err(|e| CredentialError::Corrupt(format!("{}: {e}", self.path.display())))?;
        Ok(Some(tokens))
    }

    /// Rewrite the whole token document, creating its directory on first
    /// use. Writes to a temp sibling and renames into place.
    fn write_tokens(&self, tokens: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
            restrict_to_owner(dir, 0o700)?;
        }

        let contents = serde_json::to_vec_pretty(tokens)
            .map_err(|e| CredentialError::Backend(format!("failed to encode tokens: {e}")))?;

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        restrict_to_owner(&temp_path, 0o600)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!(entries = tokens.len(), path = %self.path.display(), "wrote token document");
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        let mut tokens = self.read_tokens()?.unwrap_or_default();
        tokens.insert(Self::token_key(service, user), secret.to_string());
        self.write_tokens(&tokens)
    }

    fn get(&self, service: &str, user: &str) -> Result<String> {
        let tokens = self.read_tokens()?.ok_or(CredentialError::NotFound)?;
        tokens
            .get(&Self::token_key(service, user))
            .cloned()
            .ok_or(CredentialError::NotFound)
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        let mut tokens = self.read_tokens()?.ok_or(CredentialError::NotFound)?;
        if tokens.remove(&Self::token_key(service, user)).is_none() {
            return Err(CredentialError::NotFound);
        }
        self.write_tokens(&tokens)
    }

    fn delete_all(&self, service: &str) -> Result<()> {
        if service.is_empty() {
            return Err(CredentialError::NotFound);
        }

        let Some(mut tokens) = self.read_tokens()? else {
            // No document yet, so nothing to delete.
            return Ok(());
        };

        let prefix = format!("{service}:");
        let before = tokens.len();
        // A key must have a non-empty remainder after the prefix; a bare
        // "<service>:" entry is not scoped to any user and is retained.
        tokens.retain(|key, _| !(key.len() > prefix.len() && key.starts_with(&prefix)));

        if tokens.len() == before {
            return Ok(());
        }

        debug!(service, removed = before - tokens.len(), "deleted service credentials");
        self.write_tokens(&tokens)
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, FileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().join("store").join(TOKEN_FILE));
        (temp_dir, store)
    }

    #[test]
    fn round_trip() {
        let (_dir, store) = test_store();

        store.set("svc", "alice", "s3cret").unwrap();
        assert_eq!(store.get("svc", "alice").unwrap(), "s3cret");
    }

    #[test]
    fn round_trip_multiline_and_non_ascii() {
        let (_dir, store) = test_store();

        let secret = "line1\nline2\np@ss üöä 秘密";
        store.set("svc", "alice", secret).unwrap();
        assert_eq!(store.get("svc", "alice").unwrap(), secret);
    }

    #[test]
    fn update_overwrites_without_duplicates() {
        let (_dir, store) = test_store();

        store.set("svc", "alice", "first").unwrap();
        store.set("svc", "alice", "second").unwrap();
        assert_eq!(store.get("svc", "alice").unwrap(), "second");

        let tokens = store.read_tokens().unwrap().unwrap();
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_dir, store) = test_store();

        assert!(store.get("svc", "nobody").unwrap_err().is_not_found());

        store.set("svc", "alice", "s3cret").unwrap();
        assert!(store.get("svc", "nobody").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_is_idempotent_not_found_on_second_call() {
        let (_dir, store) = test_store();

        store.set("svc", "alice", "s3cret").unwrap();
        store.delete("svc", "alice").unwrap();
        assert!(store.delete("svc", "alice").unwrap_err().is_not_found());
        assert!(store.get("svc", "alice").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_all_scopes_to_service() {
        let (_dir, store) = test_store();

        store.set("svc", "u1", "a").unwrap();
        store.set("svc", "u2", "b").unwrap();
        store.set("other", "u1", "c").unwrap();

        store.delete_all("svc").unwrap();

        assert!(store.get("svc", "u1").unwrap_err().is_not_found());
        assert!(store.get("svc", "u2").unwrap_err().is_not_found());
        assert_eq!(store.get("other", "u1").unwrap(), "c");
    }

    #[test]
    fn delete_all_empty_service_is_rejected() {
        let (_dir, store) = test_store();

        store.set("svc", "alice", "s3cret").unwrap();
        assert!(store.delete_all("").unwrap_err().is_not_found());
        assert_eq!(store.get("svc", "alice").unwrap(), "s3cret");
    }

    #[test]
    fn delete_all_retains_entry_with_empty_user() {
        let (_dir, store) = test_store();

        store.set("svc", "", "bare").unwrap();
        store.set("svc", "alice", "scoped").unwrap();

        store.delete_all("svc").unwrap();

        assert!(store.get("svc", "alice").unwrap_err().is_not_found());
        assert_eq!(store.get("svc", "").unwrap(), "bare");
    }

    #[test]
    fn delete_all_without_document_is_a_no_op() {
        let (_dir, store) = test_store();
        store.delete_all("svc").unwrap();
    }

    #[test]
    fn delete_all_without_matches_is_a_no_op() {
        let (_dir, store) = test_store();
        store.set("other", "alice", "c").unwrap();
        store.delete_all("svc").unwrap();
        assert_eq!(store.get("other", "alice").unwrap(), "c");
    }

    #[test]
    fn corrupt_document_is_a_hard_error() {
        let (_dir, store) = test_store();

        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), b"{ not json").unwrap();

        assert!(matches!(
            store.get("svc", "alice"),
            Err(CredentialError::Corrupt(_))
        ));
        // A corrupt store is never silently reset by a write either.
        assert!(matches!(
            store.set("svc", "alice", "s3cret"),
            Err(CredentialError::Corrupt(_))
        ));
    }

    #[test]
    fn persists_across_instances() {
        let (_dir, store) = test_store();
        store.set("svc", "alice", "s3cret").unwrap();

        let reopened = FileStore::with_path(store.path().to_path_buf());
        assert_eq!(reopened.get("svc", "alice").unwrap(), "s3cret");
    }

    #[cfg(unix)]
    #[test]
    fn document_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = test_store();
        store.set("svc", "alice", "s3cret").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let dir_mode = std::fs::metadata(store.path().parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
