//! On-disk snapshot of the simulated keychain.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{eyre, WrapErr};
use keyshelf_core::backend::{MemoryBackend, PhysicalRecord};
use keyshelf_core::defaults::DEFAULT_STATE_FILE;
use serde::{Deserialize, Serialize};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    records: Vec<PhysicalRecord>,
}

/// Location of the snapshot file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `explicit` when given, otherwise the platform data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        let base = dirs::data_dir().ok_or_else(|| eyre!("no data directory on this platform"))?;
        Ok(Self::new(base.join("keyshelf").join(DEFAULT_STATE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the simulated keychain. A missing file is an empty keychain.
    pub fn load(&self) -> eyre::Result<MemoryBackend> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no snapshot yet, starting empty");
            return Ok(MemoryBackend::new());
        }
        let raw = fs::read_to_string(&self.path)
            .wrap_err_with(|| format!("reading {}", self.path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("parsing {}", self.path.display()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(eyre!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            ));
        }
        Ok(MemoryBackend::from_records(snapshot.records))
    }

    pub fn save(&self, backend: &MemoryBackend) -> eyre::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("creating {}", parent.display()))?;
        }
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            records: backend.records(),
        };
        let raw = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.path, raw).wrap_err_with(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), records = snapshot.records.len(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshelf_core::Accessibility;

    #[test]
    fn test_missing_file_is_empty_keychain() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("nested").join("keychain.json"));
        assert!(state.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("nested").join("keychain.json"));

        let backend = MemoryBackend::new();
        backend.seed(PhysicalRecord {
            account: "token".to_string(),
            service: Some("svc".to_string()),
            access_group: None,
            synchronizable: true,
            accessibility: Accessibility::AfterFirstUnlock,
            value: b"abc123".to_vec(),
        });
        state.save(&backend).unwrap();

        let raw = fs::read_to_string(state.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["records"][0]["accessibility"], "first_unlock");

        assert_eq!(state.load().unwrap().records(), backend.records());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keychain.json");
        fs::write(&path, r#"{"version": 7, "records": []}"#).unwrap();
        assert!(StateFile::new(path).load().is_err());
    }
}
