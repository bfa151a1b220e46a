//! Error types for secure entry storage.

use thiserror::Error;

use crate::backend::BackendStatus;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to callers of the secure entry store.
///
/// A backend "item not found" status never shows up here: every operation
/// converts it into an absent or empty result.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum StoreError {
    /// The credential backend reported a failure. `code` is the raw OS status
    /// (an `OSStatus` on Apple platforms), passed through for diagnostics.
    #[error("backend error: status {code}")]
    Backend {
        /// OS-specific status code.
        code: i32,
    },

    /// Stored value bytes are not valid UTF-8.
    #[error("value is not valid UTF-8: {reason}")]
    Decode {
        /// Description of the invalid byte sequence.
        reason: String,
    },
}

impl StoreError {
    /// Returns the OS status code carried by a backend error.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Backend { code } => Some(*code),
            Self::Decode { .. } => None,
        }
    }
}

impl From<BackendStatus> for StoreError {
    fn from(status: BackendStatus) -> Self {
        Self::Backend {
            code: status.code(),
        }
    }
}
