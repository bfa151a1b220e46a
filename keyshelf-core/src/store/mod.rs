//! Reconciliation core.
//!
//! [`SecureEntryStore`] makes an attribute-indexed keychain behave like a map
//! from logical key to string value. A logical key may be backed by up to two
//! physical records, one per [`Representation`], and by records written under
//! any accessibility policy. Lookups probe both representations in a fixed
//! order; writes converge them (see [`SecureEntryStore::write`]).
//!
//! The store holds no state besides the backend handle and takes no locks.
//! Concurrent calls against the same key interleave at the backend.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{BackendStatus, CredentialBackend};
use crate::error::{StoreError, StoreResult};
use crate::query::{ItemQuery, QueryScope};

mod write;

pub use write::WriteOutcome;

/// The two physical shapes of one logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// A record taking part in cross-device sync.
    Sync,
    /// A device-local record.
    NonSync,
}

impl Representation {
    /// Order in which containment checks look for a key.
    pub const PROBE_ORDER: [Self; 2] = [Self::Sync, Self::NonSync];

    /// The `synchronizable` attribute value of this representation.
    #[must_use]
    pub const fn synchronizable(self) -> bool {
        matches!(self, Self::Sync)
    }
}

/// Key-value view over a [`CredentialBackend`].
#[derive(Clone)]
pub struct SecureEntryStore {
    backend: Arc<dyn CredentialBackend>,
}

impl std::fmt::Debug for SecureEntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureEntryStore").finish_non_exhaustive()
    }
}

impl SecureEntryStore {
    /// Creates a store over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self { backend }
    }

    /// Returns the backend this store talks to.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn CredentialBackend> {
        &self.backend
    }

    /// Returns `true` if `key` has a record in either representation.
    ///
    /// Accessibility never takes part in the probe, so records written under
    /// any policy are found.
    ///
    /// # Errors
    ///
    /// The first backend failure other than not-found; later probes are not
    /// issued.
    pub fn exists(&self, scope: &QueryScope, key: &str) -> StoreResult<bool> {
        for representation in Representation::PROBE_ORDER {
            let query = scope
                .query()
                .key(key)
                .synchronizable(Some(representation.synchronizable()))
                .build();
            if self.backend.find(query).into_result()?.is_some() {
                log::debug!("key {key:?} present as {representation:?}");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reads the value stored under `key`.
    ///
    /// Looks in the backend default representation first, then among
    /// synchronizable records. A match that carries no value bytes counts as
    /// a miss. A value that is not valid UTF-8 reads as an empty string.
    ///
    /// # Errors
    ///
    /// A backend failure other than not-found on either lookup. A failure on
    /// the first lookup is returned without issuing the second.
    pub fn read(&self, scope: &QueryScope, key: &str) -> StoreResult<Option<String>> {
        let default_query = scope.query().key(key).return_data().build();
        let default_item = self.backend.find(default_query).into_result()?;
        if let Some(bytes) = default_item.and_then(|item| item.value) {
            return Ok(Some(decode_lossy(key, bytes)));
        }

        log::debug!("no local value for key {key:?}, trying synchronizable records");
        let synced_query = scope
            .query()
            .key(key)
            .synchronizable(Some(true))
            .return_data()
            .build();
        Ok(self
            .backend
            .find(synced_query)
            .into_result()?
            .and_then(|item| item.value)
            .map(|bytes| decode_lossy(key, bytes)))
    }

    /// Reads every entry in the scope.
    ///
    /// Filters on the scope's synchronizable state but not on accessibility.
    /// When two records carry the same key the one returned later wins.
    ///
    /// # Errors
    ///
    /// A backend failure other than not-found.
    pub fn read_all(&self, scope: &QueryScope) -> StoreResult<HashMap<String, String>> {
        let query = scope
            .query()
            .synchronizable(scope.synchronizable)
            .all()
            .build();
        let items = self.backend.find_all(query).into_result()?;

        let mut entries = HashMap::with_capacity(items.len());
        for item in items {
            let Some(account) = item.account else {
                log::debug!("skipping record without an account attribute");
                continue;
            };
            let value = decode_lossy(&account, item.value.unwrap_or_default());
            entries.insert(account, value);
        }
        Ok(entries)
    }

    /// Deletes `key` in the scope's representation and accessibility.
    /// Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// A backend failure other than not-found.
    pub fn delete(&self, scope: &QueryScope, key: &str) -> StoreResult<()> {
        self.delete_matching(
            scope
                .query()
                .key(key)
                .synchronizable(scope.synchronizable)
                .accessibility(scope.accessibility)
                .build(),
        )
    }

    /// Deletes every record in the scope with one backend call. An empty
    /// scope succeeds.
    ///
    /// # Errors
    ///
    /// A backend failure other than not-found.
    pub fn delete_all(&self, scope: &QueryScope) -> StoreResult<()> {
        self.delete_matching(
            scope
                .query()
                .synchronizable(scope.synchronizable)
                .accessibility(scope.accessibility)
                .build(),
        )
    }

    fn delete_matching(&self, query: ItemQuery) -> StoreResult<()> {
        match self.backend.delete(query) {
            BackendStatus::Success | BackendStatus::NotFound => Ok(()),
            status => Err(status.into()),
        }
    }
}

/// Decodes stored value bytes.
///
/// # Errors
///
/// [`StoreError::Decode`] when the bytes are not valid UTF-8.
pub fn decode_value(bytes: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(bytes).map_err(|error| StoreError::Decode {
        reason: error.utf8_error().to_string(),
    })
}

fn decode_lossy(key: &str, bytes: Vec<u8>) -> String {
    decode_value(bytes).unwrap_or_else(|error| {
        log::warn!("value of key {key:?} replaced by an empty string: {error}");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::Accessibility;
    use crate::backend::{MemoryBackend, PhysicalRecord};

    fn store() -> (Arc<MemoryBackend>, SecureEntryStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = SecureEntryStore::new(backend.clone());
        (backend, store)
    }

    fn seed(backend: &MemoryBackend, key: &str, synchronizable: bool, value: &[u8]) {
        backend.seed(PhysicalRecord {
            account: key.to_string(),
            service: Some("svc".to_string()),
            access_group: None,
            synchronizable,
            accessibility: Accessibility::AfterFirstUnlock,
            value: value.to_vec(),
        });
    }

    #[test]
    fn test_probe_order_starts_with_sync() {
        assert_eq!(
            Representation::PROBE_ORDER,
            [Representation::Sync, Representation::NonSync]
        );
        assert!(Representation::Sync.synchronizable());
        assert!(!Representation::NonSync.synchronizable());
    }

    #[test]
    fn test_exists_finds_either_representation() {
        let (backend, store) = store();
        let scope = QueryScope::new("svc");
        seed(&backend, "synced", true, b"1");
        seed(&backend, "local", false, b"2");

        assert!(store.exists(&scope, "synced").unwrap());
        assert!(store.exists(&scope, "local").unwrap());
        assert!(!store.exists(&scope, "missing").unwrap());
    }

    #[test]
    fn test_read_prefers_local_record() {
        let (backend, store) = store();
        let scope = QueryScope::new("svc");
        seed(&backend, "k", true, b"synced");
        seed(&backend, "k", false, b"local");

        assert_eq!(store.read(&scope, "k").unwrap().as_deref(), Some("local"));
    }

    #[test]
    fn test_invalid_utf8_reads_as_empty_string() {
        let (backend, store) = store();
        let scope = QueryScope::new("svc");
        seed(&backend, "bad", false, &[0xff, 0xfe]);

        assert_eq!(store.read(&scope, "bad").unwrap().as_deref(), Some(""));
        assert_eq!(
            store.read_all(&scope).unwrap().get("bad").map(String::as_str),
            Some("")
        );
    }

    #[test]
    fn test_decode_value_reports_invalid_bytes() {
        assert_eq!(decode_value(b"ok".to_vec()), Ok("ok".to_string()));
        assert!(matches!(
            decode_value(vec![0xc3]),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn test_read_all_filters_on_synchronizable_only() {
        let (backend, store) = store();
        seed(&backend, "a", true, b"1");
        seed(&backend, "b", false, b"2");

        let synced = store
            .read_all(&QueryScope::new("svc").with_synchronizable(true))
            .unwrap();
        assert_eq!(synced.len(), 1);
        assert_eq!(synced.get("a").map(String::as_str), Some("1"));

        let local = store.read_all(&QueryScope::new("svc")).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_delete_respects_accessibility_filter() {
        let (backend, store) = store();
        seed(&backend, "k", false, b"v");

        let other_policy = QueryScope::new("svc").with_accessibility(Accessibility::WhenUnlocked);
        store.delete(&other_policy, "k").unwrap();
        assert_eq!(backend.len(), 1);

        store.delete(&QueryScope::new("svc"), "k").unwrap();
        assert!(backend.is_empty());
    }
}
