//! Overlay sidecar process.
//!
//! Launched by the main process with `--core-port`; binds its own RPC
//! server and registers it once.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use slumber_core::RunMode;
use slumber_sidecar::supervisor::{start_blocking, SupervisorConfig};
use slumber_sidecar::NotificationQueue;

#[derive(Parser, Debug)]
#[command(
    name = "slumber-overlay",
    version,
    about = "Overlay sidecar for the slumber bridge",
    long_about = None,
)]
struct Cli {
    /// Main-process RPC port.
    #[arg(long)]
    core_port: u16,

    /// Keep running when registration with the main process fails.
    #[arg(long)]
    diagnostic: bool,

    /// Maximum number of notifications shown at once.
    #[arg(long, default_value_t = slumber_sidecar::overlay::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let run_mode = if cli.diagnostic {
        RunMode::Diagnostic
    } else {
        RunMode::Strict
    };
    let config = SupervisorConfig::for_core_port(cli.core_port, run_mode);
    let overlay = Arc::new(NotificationQueue::new(cli.queue_capacity));
    start_blocking(config, overlay).context("overlay sidecar exited with error")
}
