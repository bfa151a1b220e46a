//! Command-line interface.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keyshelf_core::defaults::DEFAULT_SERVICE;
use keyshelf_core::StorageOptions;

pub use commands::execute;

/// Keyshelf: keychain-style secure storage, simulated on disk.
#[derive(Parser, Debug)]
#[command(name = "keyshelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Simulated keychain snapshot. Defaults to a file under the platform
    /// data directory.
    #[arg(long, global = true, env = "KEYSHELF_STATE")]
    pub state: Option<PathBuf>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every storage operation.
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    /// Namespace keys live in.
    #[arg(long, global = true, env = "KEYSHELF_SERVICE", default_value = DEFAULT_SERVICE)]
    pub service: String,

    /// Cross-app sharing scope.
    #[arg(long, global = true, env = "KEYSHELF_ACCESS_GROUP")]
    pub access_group: Option<String>,

    /// Synchronization state to request. Omit to follow the keychain default.
    #[arg(long, global = true, env = "KEYSHELF_SYNCHRONIZABLE")]
    pub synchronizable: Option<bool>,

    /// Accessibility token (passcode, unlocked, unlocked_this_device,
    /// first_unlock, first_unlock_this_device).
    #[arg(long, global = true, env = "KEYSHELF_ACCESSIBILITY")]
    pub accessibility: Option<String>,

    /// Select the data-protection keychain (accepted, has no effect on the
    /// simulation).
    #[arg(long, global = true)]
    pub data_protection_keychain: bool,

    /// Wipe the scope and answer with an empty result when the backend fails.
    #[arg(long, global = true, env = "KEYSHELF_RESET_ON_ERROR")]
    pub reset_on_error: bool,
}

impl ScopeArgs {
    /// Per-call storage options for these arguments.
    pub fn options(&self) -> StorageOptions {
        StorageOptions {
            service: Some(self.service.clone()),
            access_group: self.access_group.clone(),
            synchronizable: self.synchronizable,
            accessibility: self.accessibility.clone(),
            use_data_protection_keychain: self.data_protection_keychain,
            reset_on_error: self.reset_on_error,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print whether a key has a value.
    Exists {
        /// Logical key.
        key: String,
    },

    /// Print the value stored under a key.
    Read {
        /// Logical key.
        key: String,
    },

    /// Print every entry in the scope as a JSON object.
    ReadAll,

    /// Store a value and print which write path was taken.
    Write {
        /// Logical key.
        key: String,
        /// Value to store.
        value: String,
    },

    /// Delete a key. Deleting a missing key succeeds.
    Delete {
        /// Logical key.
        key: String,
    },

    /// Delete every entry in the scope.
    DeleteAll,

    /// Print the physical records of the simulated keychain.
    Dump {
        /// Only show records backing this key.
        #[arg(long)]
        key: Option<String>,
    },

    /// Insert a physical record directly, bypassing reconciliation. Use it to
    /// reproduce records left behind by older clients.
    Seed {
        /// Logical key.
        key: String,
        /// Value to store.
        value: String,
    },
}
