//! Storage backends for credential persistence
//!
//! One backend per native mechanism, plus a file-backed store of last
//! resort and a composite combinator for chaining them.

mod composite;
mod file;
mod traits;

#[cfg(target_os = "linux")]
mod keyctl;
#[cfg(target_os = "linux")]
mod secret_service;

#[cfg(any(target_os = "macos", target_os = "windows"))]
mod keychain;

pub use composite::CompositeStore;
pub use file::FileStore;
pub use traits::CredentialStore;

#[cfg(target_os = "linux")]
pub use keyctl::KeyctlStore;
#[cfg(target_os = "linux")]
pub use secret_service::SecretServiceStore;

#[cfg(any(target_os = "macos", target_os = "windows"))]
pub use keychain::KeychainStore;
