//! `keyshelf`: developer CLI over a simulated keychain.
//!
//! Every invocation loads the keychain snapshot, runs one storage operation
//! through the same reconciliation code host apps use, and saves the snapshot
//! back. `RUST_LOG=keyshelf=debug` shows the probes and migration steps.

mod cli;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keyshelf=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    execute(cli, &mut std::io::stdout().lock())
}
