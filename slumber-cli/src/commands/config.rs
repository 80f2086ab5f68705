//! `slumber config`: write defaults or print the effective config.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use slumber_core::{config, Config};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config as YAML.
    Show,
}

pub fn run(command: ConfigCommand, explicit: Option<&Path>) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    match command {
        ConfigCommand::Init { force } => {
            if explicit.is_some() {
                bail!("`config init` always writes {}", config::config_path_at(&home).display());
            }
            let path = config::config_path_at(&home);
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            let path = config::save_at(&home, &Config::default()).context("failed to write config")?;
            println!("wrote {}", path.display());
        }
        ConfigCommand::Show => {
            let config = match explicit {
                Some(path) => config::load_from(path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                None => config::load_at(&home).context("failed to load config")?,
            };
            print!(
                "{}",
                serde_yaml::to_string(&config).context("failed to render config YAML")?
            );
        }
    }
    Ok(())
}
