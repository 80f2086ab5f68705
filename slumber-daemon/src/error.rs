use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the main-process runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] slumber_core::ConfigError),

    #[error("OSC transport error: {0}")]
    Transport(#[from] slumber_osc::TransportError),

    #[error("sync error: {0}")]
    Sync(#[from] slumber_sync::SyncError),

    #[error("sidecar RPC error: {0}")]
    Sidecar(#[from] slumber_sidecar::SidecarError),

    #[error("daemon protocol error: {0}")]
    Protocol(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
