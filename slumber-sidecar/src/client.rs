//! Long-lived RPC client.
//!
//! The connection is opened on first use and kept for later calls. When a
//! call on a previously working connection fails at the socket level, the
//! client reconnects once and retries; a failure on a fresh connection is
//! returned to the caller.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use slumber_core::NotificationId;

use crate::error::{io_err, SidecarError};
use crate::protocol::{AddNotificationResponse, RpcRequest, RpcResponse};

pub const CALL_TIMEOUT: Duration = Duration::from_secs(5);

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

pub struct RpcClient {
    addr: SocketAddr,
    conn: Option<Connection>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("addr", &self.addr)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl RpcClient {
    /// A client that connects lazily on the first call.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, conn: None }
    }

    /// A client whose connection is established up front.
    pub async fn connect(addr: SocketAddr) -> Result<Self, SidecarError> {
        let mut client = Self::new(addr);
        client.conn = Some(open(addr).await?);
        Ok(client)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send one request and return the response `data` (or `null`).
    pub async fn call(&mut self, request: &RpcRequest) -> Result<Value, SidecarError> {
        let reused = self.conn.is_some();
        match self.call_once(request).await {
            Err(err) if reused && err.is_connection_failure() => {
                tracing::debug!(addr = %self.addr, error = %err, "RPC connection stale, reconnecting");
                self.call_once(request).await
            }
            other => other,
        }
    }

    pub async fn on_overlay_sidecar_start(&mut self, pid: u32, port: u32) -> Result<(), SidecarError> {
        self.call(&RpcRequest::OnOverlaySidecarStart { pid, port })
            .await
            .map(|_| ())
    }

    pub async fn add_notification(
        &mut self,
        message: impl Into<String>,
        duration_ms: u32,
    ) -> Result<Option<NotificationId>, SidecarError> {
        let data = self
            .call(&RpcRequest::AddNotification {
                message: message.into(),
                duration_ms,
            })
            .await?;
        if data.is_null() {
            return Ok(None);
        }
        let response: AddNotificationResponse = serde_json::from_value(data)?;
        Ok(response.notification_id)
    }

    pub async fn clear_notification(&mut self, notification_id: NotificationId) -> Result<(), SidecarError> {
        self.call(&RpcRequest::ClearNotification { notification_id })
            .await
            .map(|_| ())
    }

    pub async fn status(&mut self) -> Result<Value, SidecarError> {
        self.call(&RpcRequest::Status).await
    }

    async fn call_once(&mut self, request: &RpcRequest) -> Result<Value, SidecarError> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => open(self.addr).await?,
        };

        let response = timeout(CALL_TIMEOUT, exchange(&mut conn, request))
            .await
            .map_err(|_| SidecarError::Timeout { addr: self.addr })??;

        // Only a connection that completed an exchange is kept.
        self.conn = Some(conn);
        response_into_data(response)
    }
}

async fn open(addr: SocketAddr) -> Result<Connection, SidecarError> {
    let stream = timeout(CALL_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| SidecarError::Timeout { addr })?
        .map_err(|source| SidecarError::Unreachable { addr, source })?;
    let (reader, writer) = stream.into_split();
    Ok(Connection {
        lines: BufReader::new(reader).lines(),
        writer,
    })
}

async fn exchange(conn: &mut Connection, request: &RpcRequest) -> Result<RpcResponse, SidecarError> {
    let mut payload = serde_json::to_string(request)?;
    payload.push('\n');
    conn.writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("rpc write", e))?;
    conn.writer.flush().await.map_err(|e| io_err("rpc flush", e))?;

    let line = conn
        .lines
        .next_line()
        .await
        .map_err(|e| io_err("rpc read", e))?
        .ok_or_else(|| {
            io_err(
                "rpc read",
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "endpoint closed connection before responding",
                ),
            )
        })?;
    Ok(serde_json::from_str(line.trim_end())?)
}

fn response_into_data(response: RpcResponse) -> Result<Value, SidecarError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(SidecarError::Protocol(
            response
                .error
                .unwrap_or_else(|| "unknown RPC error".to_string()),
        ))
    }
}
