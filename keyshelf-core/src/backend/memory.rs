//! In-memory credential backend.
//!
//! Emulates the matching rules of the Apple keychain closely enough to
//! exercise every reconciliation path: an unset synchronizable constraint only
//! matches non-synchronizable records, identity ignores accessibility, and an
//! existing record's accessibility cannot be changed by an update.
//!
//! Records live in insertion order, which is the order bulk lookups return.
//! The data-protection keychain selector is accepted and ignored.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::accessibility::Accessibility;
use crate::query::{ItemAttributes, ItemChanges, ItemQuery, MatchLimit};

use super::status::{BackendStatus, ERR_SEC_PARAM};
use super::traits::{CredentialBackend, FindAllReply, FindReply, FoundItem};

/// A stored record with every attribute the backend tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalRecord {
    /// Logical key.
    pub account: String,
    /// Namespace.
    pub service: Option<String>,
    /// Cross-app sharing scope.
    pub access_group: Option<String>,
    /// Whether the record takes part in cross-device sync.
    pub synchronizable: bool,
    /// Decryption policy.
    pub accessibility: Accessibility,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

impl PhysicalRecord {
    /// Builds a record from insert attributes, applying backend defaults.
    #[must_use]
    pub fn from_attributes(attributes: ItemAttributes) -> Self {
        Self {
            account: attributes.account,
            service: attributes.service,
            access_group: attributes.access_group,
            synchronizable: attributes.synchronizable.unwrap_or(false),
            accessibility: attributes.accessibility.unwrap_or_default(),
            value: attributes.value,
        }
    }

    fn same_identity(&self, other: &Self) -> bool {
        self.account == other.account
            && self.service == other.service
            && self.access_group == other.access_group
            && self.synchronizable == other.synchronizable
    }

    fn matches(&self, query: &ItemQuery) -> bool {
        fn constraint<T: PartialEq + ?Sized>(wanted: Option<&T>, actual: Option<&T>) -> bool {
            wanted.is_none_or(|wanted| Some(wanted) == actual)
        }

        constraint(query.account.as_deref(), Some(self.account.as_str()))
            && constraint(query.service.as_deref(), self.service.as_deref())
            && constraint(query.access_group.as_deref(), self.access_group.as_deref())
            && query.synchronizable.unwrap_or(false) == self.synchronizable
            && constraint(query.accessibility.as_ref(), Some(&self.accessibility))
    }

    fn project(&self, query: &ItemQuery) -> FoundItem {
        FoundItem {
            account: query.return_attributes.then(|| self.account.clone()),
            value: query.return_data.then(|| self.value.clone()),
        }
    }
}

/// Thread-safe in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<PhysicalRecord>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `records`, for example a saved snapshot.
    #[must_use]
    pub const fn from_records(records: Vec<PhysicalRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Returns a snapshot of every stored record.
    #[must_use]
    pub fn records(&self) -> Vec<PhysicalRecord> {
        self.lock().clone()
    }

    /// Returns the stored records backing `account`, across all namespaces.
    #[must_use]
    pub fn records_for(&self, account: &str) -> Vec<PhysicalRecord> {
        self.lock()
            .iter()
            .filter(|record| record.account == account)
            .cloned()
            .collect()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stores a record directly, subject only to the identity check. Used to
    /// reproduce entries written by older clients.
    pub fn seed(&self, record: PhysicalRecord) -> BackendStatus {
        let mut records = self.lock();
        if records.iter().any(|existing| existing.same_identity(&record)) {
            return BackendStatus::Duplicate;
        }
        records.push(record);
        BackendStatus::Success
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PhysicalRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialBackend for MemoryBackend {
    fn find(&self, query: ItemQuery) -> FindReply {
        self.lock()
            .iter()
            .find(|record| record.matches(&query))
            .map_or_else(
                || FindReply::status(BackendStatus::NotFound),
                |record| FindReply::found(record.project(&query)),
            )
    }

    fn find_all(&self, query: ItemQuery) -> FindAllReply {
        let records = self.lock();
        let mut matches = records.iter().filter(|record| record.matches(&query));
        let items: Vec<FoundItem> = match query.match_limit {
            MatchLimit::One => matches.next().map(|r| r.project(&query)).into_iter().collect(),
            MatchLimit::All => matches.map(|r| r.project(&query)).collect(),
        };
        if items.is_empty() {
            FindAllReply::status(BackendStatus::NotFound)
        } else {
            FindAllReply::found(items)
        }
    }

    fn insert(&self, attributes: ItemAttributes) -> BackendStatus {
        self.seed(PhysicalRecord::from_attributes(attributes))
    }

    fn update(&self, query: ItemQuery, changes: ItemChanges) -> BackendStatus {
        let mut records = self.lock();
        let targets: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.matches(&query))
            .map(|(index, _)| index)
            .collect();
        if targets.is_empty() {
            return BackendStatus::NotFound;
        }

        if let Some(requested) = changes.accessibility {
            if targets
                .iter()
                .any(|&index| records[index].accessibility != requested)
            {
                return BackendStatus::Failure {
                    code: ERR_SEC_PARAM,
                };
            }
        }

        let updated: Vec<PhysicalRecord> = targets
            .iter()
            .map(|&index| {
                let mut record = records[index].clone();
                record.value.clone_from(&changes.value);
                if let Some(synchronizable) = changes.synchronizable {
                    record.synchronizable = synchronizable;
                }
                record
            })
            .collect();

        // All or nothing: reject before touching any record.
        let untouched = records
            .iter()
            .enumerate()
            .filter(|(index, _)| !targets.contains(index))
            .map(|(_, record)| record);
        let collides = updated.iter().enumerate().any(|(position, record)| {
            untouched.clone().any(|other| other.same_identity(record))
                || updated[position + 1..]
                    .iter()
                    .any(|other| other.same_identity(record))
        });
        if collides {
            return BackendStatus::Duplicate;
        }

        for (&index, record) in targets.iter().zip(updated) {
            records[index] = record;
        }
        BackendStatus::Success
    }

    fn delete(&self, query: ItemQuery) -> BackendStatus {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|record| !record.matches(&query));
        if records.len() == before {
            BackendStatus::NotFound
        } else {
            BackendStatus::Success
        }
    }
}
