use std::net::SocketAddr;

use thiserror::Error;

/// Error surface for the sidecar RPC channel and handshake.
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot reach RPC endpoint {addr}: {source}")]
    Unreachable {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("RPC call to {addr} timed out")]
    Timeout { addr: SocketAddr },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC protocol error: {0}")]
    Protocol(String),

    #[error("cannot determine bound RPC port: {0}")]
    PortDiscovery(String),

    #[error("no overlay sidecar is registered")]
    NotRegistered,
}

impl SidecarError {
    /// Whether the connection that produced this error is unusable.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            SidecarError::Io { .. } | SidecarError::Unreachable { .. } | SidecarError::Timeout { .. }
        )
    }
}

pub(crate) fn io_err(context: impl Into<String>, source: std::io::Error) -> SidecarError {
    SidecarError::Io {
        context: context.into(),
        source,
    }
}
