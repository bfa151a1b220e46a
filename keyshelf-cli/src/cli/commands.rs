//! Command handlers. Each command runs against the snapshot loaded for this
//! invocation; the snapshot is saved back once the command succeeds.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use eyre::eyre;
use keyshelf_core::backend::{BackendStatus, MemoryBackend, PhysicalRecord};
use keyshelf_core::{SecureStorage, StorageOptions};

use super::{Cli, Command, ScopeArgs};
use crate::state::StateFile;

/// Execute the parsed CLI command, writing results to `out`.
pub fn execute(cli: Cli, out: &mut impl Write) -> eyre::Result<()> {
    let state = StateFile::resolve(cli.state)?;
    tracing::debug!(path = %state.path().display(), "using keychain snapshot");
    let backend = Arc::new(state.load()?);
    let storage = SecureStorage::new(backend.clone());

    run(&cli.command, &cli.scope, &storage, &backend, out)?;
    state.save(&backend)
}

fn run(
    command: &Command,
    scope: &ScopeArgs,
    storage: &SecureStorage,
    backend: &MemoryBackend,
    out: &mut impl Write,
) -> eyre::Result<()> {
    let options = scope.options();
    match command {
        Command::Exists { key } => {
            writeln!(out, "{}", storage.contains_key(options, key.clone())?)?;
        }
        Command::Read { key } => {
            if let Some(value) = storage.read(options, key.clone())? {
                writeln!(out, "{value}")?;
            } else {
                tracing::info!(%key, "no value stored");
            }
        }
        Command::ReadAll => {
            let entries: BTreeMap<_, _> = storage.read_all(options)?.into_iter().collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
        }
        Command::Write { key, value } => cmd_write(storage, &options, key, value, out)?,
        Command::Delete { key } => storage.delete(options, key.clone())?,
        Command::DeleteAll => storage.delete_all(options)?,
        Command::Dump { key } => {
            let records = match key {
                Some(key) => backend.records_for(key),
                None => backend.records(),
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
        }
        Command::Seed { key, value } => cmd_seed(backend, &options, key, value)?,
    }
    Ok(())
}

fn cmd_write(
    storage: &SecureStorage,
    options: &StorageOptions,
    key: &str,
    value: &str,
    out: &mut impl Write,
) -> eyre::Result<()> {
    match storage.write_outcome(options, key, value)? {
        Some(outcome) => writeln!(out, "{outcome}")?,
        None => {
            tracing::warn!(%key, "write failed, scope was reset");
            writeln!(out, "reset")?;
        }
    }
    Ok(())
}

fn cmd_seed(
    backend: &MemoryBackend,
    options: &StorageOptions,
    key: &str,
    value: &str,
) -> eyre::Result<()> {
    let scope = options.scope();
    let record = PhysicalRecord {
        account: key.to_string(),
        service: scope.service,
        access_group: scope.access_group,
        synchronizable: scope.synchronizable.unwrap_or(false),
        accessibility: scope.accessibility.unwrap_or_default(),
        value: value.as_bytes().to_vec(),
    };
    match backend.seed(record) {
        BackendStatus::Success => Ok(()),
        BackendStatus::Duplicate => Err(eyre!(
            "a record for {key:?} with this synchronizable state already exists"
        )),
        status => Err(eyre!("seeding failed with status {}", status.code())),
    }
}
