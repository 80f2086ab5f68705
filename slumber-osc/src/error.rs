use std::net::SocketAddr;

use thiserror::Error;

/// A datagram that could not be decoded. Scoped to that datagram only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("packet is empty")]
    Empty,

    #[error("address must start with '/' or be '#bundle'")]
    InvalidAddress,

    #[error("string at offset {offset} is not NUL-terminated")]
    UnterminatedString { offset: usize },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("type tag string must start with ','")]
    MissingTypeTags,

    #[error("unknown type tag '{0}'")]
    UnknownTypeTag(char),

    #[error("truncated payload: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Socket-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not bind UDP socket to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("UDP send to {target} failed: {source}")]
    Send {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("UDP receive failed: {0}")]
    Receive(#[source] std::io::Error),
}
