//! Keychain-backed key-value secure storage.
//!
//! [`SecureEntryStore`] turns an attribute-indexed credential store (the
//! Apple keychain, or any [`CredentialBackend`]) into a deterministic map
//! from key to string value. Legacy records written under another
//! accessibility policy or synchronization state are still found, and a
//! policy change migrates the record transparently.
//!
//! Foreign callers use [`SecureStorage`], which takes per-call
//! [`StorageOptions`].
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod accessibility;
pub use accessibility::*;

pub mod backend;
pub use backend::{BackendStatus, CredentialBackend, MemoryBackend};

/// Workspace-wide default values.
pub mod defaults;

mod error;
pub use error::*;

mod ffi;
pub use ffi::*;

/// Forwarding of log records to the host application.
pub mod logger;

mod query;
pub use query::*;

mod store;
pub use store::{decode_value, Representation, SecureEntryStore, WriteOutcome};

uniffi::setup_scaffolding!("keyshelf_core");
