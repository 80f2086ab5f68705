//! Loopback RPC server shared by both ends of the handshake.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::error::{io_err, SidecarError};
use crate::protocol::{RpcRequest, RpcResponse};

/// Request handler. Calls run on the connection's task and must not block.
pub trait RpcService: Send + Sync + 'static {
    fn handle(&self, request: RpcRequest) -> RpcResponse;
}

pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self, SidecarError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| io_err(format!("bind {addr}"), e))?;
        Ok(Self { listener })
    }

    /// Bind `127.0.0.1` on a port chosen by the OS.
    pub async fn bind_ephemeral() -> Result<Self, SidecarError> {
        Self::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SidecarError> {
        self.listener
            .local_addr()
            .map_err(|e| SidecarError::PortDiscovery(e.to_string()))
    }

    /// Accept connections until shutdown is signalled. Open connections are
    /// closed on shutdown too.
    pub async fn serve<S: RpcService>(
        self,
        service: Arc<S>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), SidecarError> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.map_err(|e| io_err("rpc accept", e))?;
                    let service = service.clone();
                    let client_shutdown = shutdown_rx.resubscribe();
                    tokio::spawn(async move {
                        if let Err(err) = handle_client(stream, service, client_shutdown).await {
                            tracing::warn!(%peer, error = %err, "RPC client error");
                        }
                    });
                }
            }
        }
        Ok(())
    }
}

async fn handle_client<S: RpcService>(
    stream: TcpStream,
    service: Arc<S>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), SidecarError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown_rx.recv() => break,
            line = lines.next_line() => line.map_err(|e| io_err("rpc socket read", e))?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => {
                tracing::debug!(cmd = request.name(), "handling RPC request");
                service.handle(request)
            }
            Err(err) => RpcResponse::error(format!("invalid request JSON: {err}")),
        };
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

async fn write_response(writer: &mut OwnedWriteHalf, response: &RpcResponse) -> Result<(), SidecarError> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("rpc socket write", e))?;
    writer.flush().await.map_err(|e| io_err("rpc socket flush", e))?;
    Ok(())
}
