//! Composite storage backend
//!
//! A pure control-flow combinator: delegates every operation to a primary
//! backend and, when the primary fails, retries the same operation on an
//! optional fallback backend.

use tracing::debug;

use super::CredentialStore;
use crate::error::Result;

/// Storage backend that chains a primary and an optional fallback
///
/// Any primary error triggers the fallback, including `NotFound` - a
/// credential absent from the primary but present in a lower-priority
/// backend is still retrievable. The fallback's result is returned
/// verbatim, discarding the primary's error.
///
/// The fallback may itself be a `CompositeStore`, so backends can be
/// chained into degradation lists of arbitrary length.
pub struct CompositeStore {
    primary: Box<dyn CredentialStore>,
    fallback: Option<Box<dyn CredentialStore>>,
}

impl CompositeStore {
    /// Create a composite from a primary and an optional fallback
    pub fn new(
        primary: Box<dyn CredentialStore>,
        fallback: Option<Box<dyn CredentialStore>>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl CredentialStore for CompositeStore {
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        let result = self.primary.set(service, user, secret);
        if let Err(e) = &result {
            if let Some(fallback) = &self.fallback {
                debug!(error = %e, "primary set failed, using fallback");
                return fallback.set(service, user, secret);
            }
        }
        result
    }

    fn get(&self, service: &str, user: &str) -> Result<String> {
        let result = self.primary.get(service, user);
        if let Err(e) = &result {
            if let Some(fallback) = &self.fallback {
                debug!(error = %e, "primary get failed, using fallback");
                return fallback.get(service, user);
            }
        }
        result
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        let result = self.primary.delete(service, user);
        if let Err(e) = &result {
            if let Some(fallback) = &self.fallback {
                debug!(error = %e, "primary delete failed, using fallback");
                return fallback.delete(service, user);
            }
        }
        result
    }

    fn delete_all(&self, service: &str) -> Result<()> {
        let result = self.primary.delete_all(service);
        if let Err(e) = &result {
            if let Some(fallback) = &self.fallback {
                debug!(error = %e, "primary delete_all failed, using fallback");
                return fallback.delete_all(service);
            }
        }
        result
    }
}
