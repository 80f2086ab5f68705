//! UDP socket ownership for the control protocol.
//!
//! [`bind`] is called once per process. It returns a cloneable [`OscSender`]
//! and the single [`OscReceiver`] for the socket; the receiver is the only
//! inbound stream and cannot be recreated without rebinding.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use slumber_core::ControlMessage;

use crate::codec::{decode_packet, encode};
use crate::error::TransportError;

/// Largest datagram we accept; anything longer is truncated by the OS and
/// will fail to decode.
const MAX_DATAGRAM: usize = 65_507;

/// Anything outbound control messages can be written to.
pub trait OscSink: Send + Sync {
    fn send(&self, message: &ControlMessage) -> Result<(), TransportError>;
}

/// Bind the control socket on `listen`.
pub async fn bind(listen: SocketAddr) -> Result<(OscSender, OscReceiver), TransportError> {
    let socket = UdpSocket::bind(listen)
        .await
        .map_err(|source| TransportError::Bind {
            addr: listen,
            source,
        })?;
    let socket = Arc::new(socket);
    tracing::info!(addr = %listen, "OSC socket bound");

    Ok((
        OscSender {
            socket: socket.clone(),
        },
        OscReceiver {
            socket,
            buf: vec![0; MAX_DATAGRAM],
            pending: VecDeque::new(),
            dropped: 0,
        },
    ))
}

/// Send half of the bound socket.
#[derive(Debug, Clone)]
pub struct OscSender {
    socket: Arc<UdpSocket>,
}

impl OscSender {
    /// Fire-and-forget send. There is no delivery acknowledgement.
    pub fn send_to(&self, target: SocketAddr, message: &ControlMessage) -> Result<(), TransportError> {
        let payload = encode(message);
        self.socket
            .try_send_to(&payload, target)
            .map_err(|source| TransportError::Send { target, source })?;
        tracing::trace!(%target, address = %message.address, "sent control message");
        Ok(())
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Bind this sender to a fixed destination.
    pub fn to(&self, target: SocketAddr) -> OscTarget {
        OscTarget {
            sender: self.clone(),
            target,
        }
    }
}

/// A sender with a fixed destination, usually the game endpoint.
#[derive(Debug, Clone)]
pub struct OscTarget {
    sender: OscSender,
    target: SocketAddr,
}

impl OscTarget {
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl OscSink for OscTarget {
    fn send(&self, message: &ControlMessage) -> Result<(), TransportError> {
        self.sender.send_to(self.target, message)
    }
}

/// Receive half of the bound socket: an endless stream of decoded messages.
#[derive(Debug)]
pub struct OscReceiver {
    socket: Arc<UdpSocket>,
    buf: Vec<u8>,
    pending: VecDeque<ControlMessage>,
    dropped: u64,
}

impl OscReceiver {
    /// Wait for the next decodable message.
    ///
    /// Undecodable datagrams are logged and skipped; only socket failures
    /// are returned as errors.
    pub async fn next(&mut self) -> Result<ControlMessage, TransportError> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(message);
            }

            let (len, peer) = match self.socket.recv_from(&mut self.buf).await {
                Ok(received) => received,
                // Windows reports ICMP port-unreachable from an earlier send here.
                Err(err) if err.kind() == ErrorKind::ConnectionReset => continue,
                Err(err) => return Err(TransportError::Receive(err)),
            };

            match decode_packet(&self.buf[..len]) {
                Ok(messages) => self.pending.extend(messages),
                Err(err) => {
                    self.dropped += 1;
                    tracing::debug!(%peer, len, error = %err, "dropping undecodable datagram");
                }
            }
        }
    }

    /// Number of datagrams dropped because they failed to decode.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
