//! Platform interface for the credential backend.

use crate::error::StoreResult;
use crate::query::{ItemAttributes, ItemChanges, ItemQuery};

use super::status::BackendStatus;

/// A record returned by a lookup. Fields are only populated when the
/// matcher asked for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct FoundItem {
    /// Account attribute (the logical key), when attributes were requested.
    pub account: Option<String>,
    /// Value bytes, when data was requested.
    pub value: Option<Vec<u8>>,
}

/// Reply to a single-record lookup.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FindReply {
    /// Backend status of the lookup.
    pub status: BackendStatus,
    /// The first matching record, present on success.
    pub item: Option<FoundItem>,
}

impl FindReply {
    /// A successful lookup.
    #[must_use]
    pub const fn found(item: FoundItem) -> Self {
        Self {
            status: BackendStatus::Success,
            item: Some(item),
        }
    }

    /// A lookup that ended with a non-success status.
    #[must_use]
    pub const fn status(status: BackendStatus) -> Self {
        Self { status, item: None }
    }

    /// Decodes the reply: not-found becomes `None`.
    ///
    /// # Errors
    ///
    /// Any status other than success and not-found.
    pub fn into_result(self) -> StoreResult<Option<FoundItem>> {
        Ok(self
            .status
            .found()?
            .then(|| self.item.unwrap_or_default()))
    }
}

/// Reply to a multi-record lookup.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FindAllReply {
    /// Backend status of the lookup.
    pub status: BackendStatus,
    /// Every matching record, in backend order.
    pub items: Vec<FoundItem>,
}

impl FindAllReply {
    /// A successful lookup.
    #[must_use]
    pub const fn found(items: Vec<FoundItem>) -> Self {
        Self {
            status: BackendStatus::Success,
            items,
        }
    }

    /// A lookup that ended with a non-success status.
    #[must_use]
    pub const fn status(status: BackendStatus) -> Self {
        Self {
            status,
            items: Vec::new(),
        }
    }

    /// Decodes the reply: not-found becomes an empty list.
    ///
    /// # Errors
    ///
    /// Any status other than success and not-found.
    pub fn into_result(self) -> StoreResult<Vec<FoundItem>> {
        if self.status.found()? {
            Ok(self.items)
        } else {
            Ok(Vec::new())
        }
    }
}

/// Attribute-indexed credential store provided by the platform.
///
/// Implementations wrap the OS keychain or credential manager. Each method is
/// a single blocking call with the backend's own per-record atomicity; the
/// caller performs no locking and no retries.
///
/// Matching rules implementations must honour:
/// - every `Some` attribute of an [`ItemQuery`] is an equality constraint;
/// - an unset `synchronizable` only matches non-synchronizable records;
/// - record identity is `(account, service, access_group, synchronizable)`;
///   accessibility is not part of it.
#[uniffi::export(with_foreign)]
pub trait CredentialBackend: Send + Sync {
    /// Returns the first record matching `query`.
    fn find(&self, query: ItemQuery) -> FindReply;

    /// Returns every record matching `query`.
    fn find_all(&self, query: ItemQuery) -> FindAllReply;

    /// Inserts a record. Reports [`BackendStatus::Duplicate`] when a record
    /// with the same identity exists.
    fn insert(&self, attributes: ItemAttributes) -> BackendStatus;

    /// Rewrites the records matching `query`. Reports a failure when the
    /// change cannot be applied in place (for example a new accessibility
    /// policy).
    fn update(&self, query: ItemQuery, changes: ItemChanges) -> BackendStatus;

    /// Deletes every record matching `query`.
    fn delete(&self, query: ItemQuery) -> BackendStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_find_reply_decoding() {
        let item = FoundItem {
            account: None,
            value: Some(b"v".to_vec()),
        };
        assert_eq!(
            FindReply::found(item.clone()).into_result(),
            Ok(Some(item))
        );
        assert_eq!(
            FindReply::status(BackendStatus::NotFound).into_result(),
            Ok(None)
        );
        assert_eq!(
            FindReply::status(BackendStatus::Failure { code: -34018 }).into_result(),
            Err(StoreError::Backend { code: -34018 })
        );
    }

    #[test]
    fn test_success_without_payload_is_still_present() {
        let reply = FindReply {
            status: BackendStatus::Success,
            item: None,
        };
        assert_eq!(reply.into_result(), Ok(Some(FoundItem::default())));
    }

    #[test]
    fn test_find_all_reply_decoding() {
        assert_eq!(
            FindAllReply::status(BackendStatus::NotFound).into_result(),
            Ok(Vec::new())
        );
        assert!(FindAllReply::status(BackendStatus::Duplicate)
            .into_result()
            .is_err());
    }
}
