//! Foreign-facing storage object.

use std::collections::HashMap;
use std::sync::Arc;

use crate::accessibility::Accessibility;
use crate::backend::CredentialBackend;
use crate::defaults::DEFAULT_SERVICE;
use crate::error::{StoreError, StoreResult};
use crate::query::QueryScope;
use crate::store::{SecureEntryStore, WriteOutcome};

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct StorageOptions {
    /// Namespace keys live in. Defaults to [`DEFAULT_SERVICE`].
    pub service: Option<String>,
    /// Cross-app sharing scope.
    pub access_group: Option<String>,
    /// Requested synchronization state. `None` follows the backend default.
    pub synchronizable: Option<bool>,
    /// Accessibility token (`passcode`, `unlocked`, `unlocked_this_device`,
    /// `first_unlock`, `first_unlock_this_device`). Unknown tokens fall back
    /// to `unlocked`; `None` leaves the policy unspecified.
    pub accessibility: Option<String>,
    /// Targets the data-protection keychain on macOS.
    pub use_data_protection_keychain: bool,
    /// On a backend failure, delete every record in the scope and answer with
    /// an empty result instead of the error.
    pub reset_on_error: bool,
}

impl StorageOptions {
    /// Resolves the options into a query scope.
    #[must_use]
    pub fn scope(&self) -> QueryScope {
        QueryScope {
            service: Some(
                self.service
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            ),
            access_group: self.access_group.clone(),
            synchronizable: self.synchronizable,
            accessibility: Accessibility::from_optional_token(self.accessibility.as_deref()),
            use_data_protection_keychain: self.use_data_protection_keychain,
        }
    }
}

/// Key-value secure storage handle for host applications.
///
/// Every call takes its own [`StorageOptions`]; the handle keeps no state
/// besides the backend.
#[derive(uniffi::Object)]
pub struct SecureStorage {
    store: SecureEntryStore,
}

impl std::fmt::Debug for SecureStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStorage").finish()
    }
}

#[allow(clippy::needless_pass_by_value)]
#[uniffi::export]
impl SecureStorage {
    /// Creates a storage handle over a host-provided backend.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self {
            store: SecureEntryStore::new(backend),
        }
    }

    /// Returns `true` if `key` has a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn contains_key(&self, options: StorageOptions, key: String) -> StoreResult<bool> {
        let scope = options.scope();
        self.recover(&options, &scope, self.store.exists(&scope, &key))
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn read(&self, options: StorageOptions, key: String) -> StoreResult<Option<String>> {
        let scope = options.scope();
        self.recover(&options, &scope, self.store.read(&scope, &key))
    }

    /// Reads every entry in the scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn read_all(&self, options: StorageOptions) -> StoreResult<HashMap<String, String>> {
        let scope = options.scope();
        self.recover(&options, &scope, self.store.read_all(&scope))
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn write(&self, options: StorageOptions, key: String, value: String) -> StoreResult<()> {
        self.write_outcome(&options, &key, &value).map(|_| ())
    }

    /// Deletes `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn delete(&self, options: StorageOptions, key: String) -> StoreResult<()> {
        let scope = options.scope();
        self.recover(&options, &scope, self.store.delete(&scope, &key))
    }

    /// Deletes every entry in the scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn delete_all(&self, options: StorageOptions) -> StoreResult<()> {
        let scope = options.scope();
        self.recover(&options, &scope, self.store.delete_all(&scope))
    }
}

#[cfg(target_vendor = "apple")]
#[uniffi::export]
impl SecureStorage {
    /// Creates a storage handle over the system keychain.
    #[uniffi::constructor]
    #[must_use]
    pub fn keychain() -> Self {
        Self::new(Arc::new(crate::backend::KeychainBackend::new()))
    }
}

/// Implementation not exposed to foreign bindings
impl SecureStorage {
    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &SecureEntryStore {
        &self.store
    }

    /// Stores `value` under `key` and reports the path taken. `None` means
    /// the write failed and the scope was reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and `reset_on_error` is unset.
    pub fn write_outcome(
        &self,
        options: &StorageOptions,
        key: &str,
        value: &str,
    ) -> StoreResult<Option<WriteOutcome>> {
        let scope = options.scope();
        let result = self.store.write(&scope, key, value).map(Some);
        self.recover(options, &scope, result)
    }

    fn recover<T: Default>(
        &self,
        options: &StorageOptions,
        scope: &QueryScope,
        result: StoreResult<T>,
    ) -> StoreResult<T> {
        match result {
            Err(error @ StoreError::Backend { .. }) if options.reset_on_error => {
                log::warn!("resetting storage scope after backend failure: {error}");
                self.store.delete_all(scope)?;
                Ok(T::default())
            }
            result => result,
        }
    }
}
