//! YAML configuration for the bridge daemon and the overlay sidecar.
//!
//! # Storage layout
//!
//! ```text
//! ~/.slumber/
//!   config.yaml   (optional, defaults apply when absent)
//! ```
//!
//! Like the rest of the workspace, every filesystem function has an
//! `_at(home: &Path, …)` form used by tests and a no-arg wrapper that derives
//! `home` from `dirs::home_dir()`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{Device, RunMode};

pub const DEFAULT_OSC_LISTEN: &str = "127.0.0.1:9001";
pub const DEFAULT_OSC_TARGET: &str = "127.0.0.1:9000";
pub const DEFAULT_NAMESPACE: &str = "Oyasumi";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub osc: OscConfig,
    pub rpc: RpcConfig,
    pub sidecar: SidecarConfig,
    pub devices: Vec<Device>,
}

/// UDP control protocol endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    /// Local endpoint the bridge binds and receives on.
    pub listen: String,
    /// Game endpoint outbound messages are sent to.
    pub target: String,
    /// The `<App>` segment in `/avatar/parameters/<App>/…`.
    pub namespace: String,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_OSC_LISTEN.to_string(),
            target: DEFAULT_OSC_TARGET.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl OscConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("osc.listen", &self.listen)
    }

    pub fn target_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("osc.target", &self.target)
    }
}

/// Main-process RPC endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Loopback port for the core RPC server. `0` lets the OS choose.
    pub core_port: u16,
}

/// Overlay sidecar launch settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    pub run_mode: RunMode,
}

impl Config {
    /// Check every field and report all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        for result in [self.osc.listen_addr(), self.osc.target_addr()] {
            if let Err(ConfigError::Invalid { problems: found }) = result {
                problems.extend(found);
            }
        }
        if self.osc.namespace.is_empty() || self.osc.namespace.contains('/') {
            problems.push(format!(
                "osc.namespace: '{}' must be a single non-empty path segment",
                self.osc.namespace
            ));
        }
        if let Some(exe) = &self.sidecar.executable {
            if exe.as_os_str().is_empty() {
                problems.push("sidecar.executable: path is empty".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

fn parse_addr(field: &str, raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse::<SocketAddr>()
        .map_err(|err| ConfigError::Invalid {
            problems: vec![format!("{field}: '{raw}' is not a valid host:port ({err})")],
        })
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<home>/.slumber/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".slumber").join("config.yaml")
}

/// Load the config under `home`, falling back to defaults if the file is absent.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

/// Load and validate a config from an explicit file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Save `config` under `home` atomically (`.tmp` + rename).
pub fn save_at(home: &Path, config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(&path, std::io::Error::other("invalid config path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
