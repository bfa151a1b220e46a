//! Write path.
//!
//! ```text
//! Probing ──absent──► Inserting ──► Done(Inserted)
//!    │
//!  present
//!    ▼
//! Updating ──ok──► Done(Updated)
//!    │
//!  refused
//!    ▼
//! Migrating ──► Inserting ──► Done(Migrated)
//! ```
//!
//! A migration whose deletes removed nothing (the only record sat in the other
//! representation) reports `Inserted`.
//!
//! Any backend failure moves to `Failed`. Between the migration deletes and
//! the final insert the key is absent: a concurrent reader sees no value and a
//! concurrent writer may win the insert, in which case this write fails with
//! the duplicate status.

use strum::Display;

use crate::accessibility::Accessibility;
use crate::backend::BackendStatus;
use crate::error::{StoreError, StoreResult};
use crate::query::QueryScope;

use super::SecureEntryStore;

/// Which path a successful write took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum WriteOutcome {
    /// The key was absent and a new record was inserted.
    Inserted,
    /// The existing record was rewritten in place.
    Updated,
    /// Existing records were deleted and a new record inserted, because the
    /// in-place update was refused (typically an accessibility change).
    Migrated,
}

#[derive(Debug)]
enum WriteStage {
    Probing,
    Updating,
    Migrating,
    Inserting { migrated: bool },
    Done(WriteOutcome),
    Failed(StoreError),
}

impl SecureEntryStore {
    /// Stores `value` under `key` with the scope's synchronizable state and
    /// accessibility.
    ///
    /// An existing record is updated in place. If the backend refuses the
    /// update, every record of the key in the requested representation is
    /// deleted (once without an accessibility constraint, then once per
    /// policy) and a fresh record is inserted.
    ///
    /// # Errors
    ///
    /// - the containment check fails (nothing was changed);
    /// - a migration delete fails with anything but not-found;
    /// - the insert fails, including with a duplicate status left by a
    ///   concurrent writer. Inserts are never retried.
    pub fn write(&self, scope: &QueryScope, key: &str, value: &str) -> StoreResult<WriteOutcome> {
        let mut stage = WriteStage::Probing;
        loop {
            stage = match stage {
                WriteStage::Probing => match self.exists(scope, key) {
                    Ok(true) => WriteStage::Updating,
                    Ok(false) => WriteStage::Inserting { migrated: false },
                    Err(error) => WriteStage::Failed(error),
                },
                WriteStage::Updating => self.update_in_place(scope, key, value),
                WriteStage::Migrating => match self.sweep(scope, key) {
                    Ok(removed) => WriteStage::Inserting { migrated: removed },
                    Err(error) => WriteStage::Failed(error),
                },
                WriteStage::Inserting { migrated } => {
                    match self.backend.insert(scope.attributes(key, value)).succeeded() {
                        Ok(()) if migrated => WriteStage::Done(WriteOutcome::Migrated),
                        Ok(()) => WriteStage::Done(WriteOutcome::Inserted),
                        Err(error) => WriteStage::Failed(error),
                    }
                }
                WriteStage::Done(outcome) => {
                    log::debug!("wrote key {key:?}: {outcome}");
                    return Ok(outcome);
                }
                WriteStage::Failed(error) => {
                    log::debug!("write of key {key:?} failed: {error}");
                    return Err(error);
                }
            };
        }
    }

    fn update_in_place(&self, scope: &QueryScope, key: &str, value: &str) -> WriteStage {
        let query = scope
            .query()
            .key(key)
            .synchronizable(scope.synchronizable)
            .build();
        match self.backend.update(query, scope.changes(value)).succeeded() {
            Ok(()) => WriteStage::Done(WriteOutcome::Updated),
            Err(error) => {
                log::debug!("in-place update of key {key:?} refused ({error}), migrating");
                WriteStage::Migrating
            }
        }
    }

    /// Deletes the key's records in the requested representation under every
    /// accessibility policy. Returns whether any delete removed a record.
    fn sweep(&self, scope: &QueryScope, key: &str) -> StoreResult<bool> {
        let mut removed = false;
        for accessibility in Accessibility::MIGRATION_SWEEP {
            let query = scope
                .query()
                .key(key)
                .synchronizable(scope.synchronizable)
                .accessibility(accessibility)
                .build();
            match self.backend.delete(query) {
                BackendStatus::Success => removed = true,
                BackendStatus::NotFound => {}
                status => return Err(status.into()),
            }
        }
        Ok(removed)
    }
}
