//! `slumber run`: main-process runtime in the foreground.

use anyhow::{Context, Result};
use clap::Args;

use slumber_core::{Config, RunMode};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Port for the main-process RPC endpoint (0 picks a free one).
    #[arg(long)]
    pub core_port: Option<u16>,

    /// Keep a launched overlay sidecar running when its handshake fails.
    #[arg(long)]
    pub diagnostic: bool,
}

impl RunArgs {
    pub fn run(self, mut config: Config) -> Result<()> {
        if let Some(port) = self.core_port {
            config.rpc.core_port = port;
        }
        if self.diagnostic {
            config.sidecar.run_mode = RunMode::Diagnostic;
        }
        slumber_daemon::start_blocking(config).context("slumber exited with error")
    }
}
