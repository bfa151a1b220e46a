//! Credential backend capability.
//!
//! The store never talks to the OS directly. It issues attribute matchers to a
//! [`CredentialBackend`] and decodes the returned [`BackendStatus`] once, at
//! this boundary.
//!
//! - [`MemoryBackend`]: in-process emulation of keychain semantics, used by
//!   tests and the developer CLI.
//! - `KeychainBackend` (Apple targets): Security.framework generic-password
//!   items.
//!
//! Host applications may also implement [`CredentialBackend`] in Swift or
//! Kotlin through the generated bindings.

mod memory;
mod status;
mod traits;

#[cfg(target_vendor = "apple")]
mod apple;

pub use memory::{MemoryBackend, PhysicalRecord};
pub use status::{
    BackendStatus, ERR_SEC_DUPLICATE_ITEM, ERR_SEC_ITEM_NOT_FOUND, ERR_SEC_PARAM,
    ERR_SEC_SUCCESS,
};
pub use traits::{CredentialBackend, FindAllReply, FindReply, FoundItem};

#[cfg(target_vendor = "apple")]
pub use apple::KeychainBackend;
