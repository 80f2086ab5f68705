//! Slumber: VR sleep-automation bridge CLI.
//!
//! # Usage
//!
//! ```text
//! slumber run [--core-port <port>] [--diagnostic]
//! slumber send <address> <value> [--type bool|int|float]
//! slumber foot-unlock
//! slumber status [--core-port <port>] [--json]
//! slumber notify --sidecar-port <port> [--duration-ms <ms>] <message>
//! slumber config init|show
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, notify::NotifyArgs, run::RunArgs, send::SendArgs, status::StatusArgs,
};
use slumber_core::{config, Config};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "slumber",
    version,
    about = "Bridge sleep automation state to the game over OSC",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.slumber/config.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bridge in the foreground.
    Run(RunArgs),

    /// Send a single control message to the game.
    Send(SendArgs),

    /// Release the avatar's foot lock.
    FootUnlock,

    /// Show the state of a running bridge.
    Status(StatusArgs),

    /// Post a notification to an overlay sidecar.
    Notify(NotifyArgs),

    /// Create or inspect the config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => args.run(load_config(config_path)?),
        Commands::Send(args) => args.run(load_config(config_path)?),
        Commands::FootUnlock => commands::send::foot_unlock(load_config(config_path)?),
        Commands::Status(args) => args.run(load_config(config_path)?),
        Commands::Notify(args) => args.run(),
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => config::load().context("failed to load config"),
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
