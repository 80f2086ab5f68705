//! Overlay sidecar bootstrap and the RPC channel between the sidecar and the
//! main process.
//!
//! Both directions speak newline-delimited JSON over loopback TCP: one
//! [`RpcRequest`] per line, answered by one [`RpcResponse`] per line.
//!
//! - [`supervisor`]: sidecar side: ephemeral RPC server + one-shot registration
//! - [`registry`]: main side: registration records and outbound notification calls
//! - [`overlay`]: the sidecar's notification queue

pub mod client;
mod error;
pub mod overlay;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod supervisor;

pub use client::RpcClient;
pub use error::SidecarError;
pub use overlay::{NotificationOverlay, NotificationQueue, OverlayService};
pub use protocol::{AddNotificationResponse, RpcRequest, RpcResponse};
pub use registry::{CoreEndpoint, SidecarRegistry, StatusProvider};
pub use server::{RpcServer, RpcService};
pub use supervisor::{handshake, init_tracing, SupervisorConfig};
