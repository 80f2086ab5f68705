use thiserror::Error;

use slumber_osc::TransportError;

/// Errors surfaced by the sync engine and its handle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}
