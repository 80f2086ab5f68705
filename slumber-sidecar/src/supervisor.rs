//! Sidecar process bootstrap.
//!
//! 1. Bind the overlay RPC server on an ephemeral loopback port.
//! 2. On a separate task, discover the bound port.
//! 3. Call `on_overlay_sidecar_start` on the main process once.
//!
//! A failure in step 2 or 3 stops the process in [`RunMode::Strict`]; in
//! [`RunMode::Diagnostic`] it is logged and the server keeps running.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::sync::broadcast;

use slumber_core::RunMode;

use crate::client::RpcClient;
use crate::error::{io_err, SidecarError};
use crate::overlay::{NotificationOverlay, OverlayService};
use crate::server::RpcServer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Main-process RPC endpoint, given to the sidecar at launch.
    pub core_addr: SocketAddr,
    pub run_mode: RunMode,
    pub pid: u32,
}

impl SupervisorConfig {
    /// Config for this process, pointed at the main process on `core_port`.
    pub fn for_core_port(core_port: u16, run_mode: RunMode) -> Self {
        Self {
            core_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, core_port)),
            run_mode,
            pid: std::process::id(),
        }
    }
}

/// Start the sidecar runtime and block the current thread until it exits.
pub fn start_blocking(
    config: SupervisorConfig,
    overlay: Arc<dyn NotificationOverlay>,
) -> Result<(), SidecarError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, overlay))
}

/// Run the sidecar: overlay RPC server, handshake, and signal handling.
pub async fn run(
    config: SupervisorConfig,
    overlay: Arc<dyn NotificationOverlay>,
) -> Result<(), SidecarError> {
    let server = RpcServer::bind_ephemeral().await?;
    let bound = server.local_addr();
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let service = Arc::new(OverlayService::new(overlay));
        tokio::spawn(async move {
            let result = server.serve(service, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let handshake_handle = {
        let shutdown = shutdown_tx.clone();
        let config = config.clone();
        tokio::spawn(async move {
            match handshake(&config, bound).await {
                Ok(port) => {
                    tracing::info!(port, core = %config.core_addr, "registered with main process");
                    Ok(())
                }
                Err(err) if config.run_mode.exits_on_handshake_failure() => {
                    tracing::error!(error = %err, "sidecar handshake failed, quitting");
                    let _ = shutdown.send(());
                    Err(err)
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        mode = %config.run_mode,
                        "sidecar handshake failed, continuing unsupervised",
                    );
                    Ok(())
                }
            }
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down sidecar");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(SidecarError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (handshake_result, server_result, signal_result) =
        tokio::join!(handshake_handle, server_handle, signal_handle);

    handle_join("handshake", handshake_result)?;
    handle_join("rpc_server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Discover the bound port and register it with the main process.
///
/// Returns the registered port.
pub async fn handshake(
    config: &SupervisorConfig,
    bound: Result<SocketAddr, SidecarError>,
) -> Result<u16, SidecarError> {
    let port = discover_port(bound)?;
    tracing::info!(port, "overlay RPC server listening");

    let mut client = RpcClient::connect(config.core_addr).await?;
    client
        .on_overlay_sidecar_start(config.pid, u32::from(port))
        .await?;
    Ok(port)
}

fn discover_port(bound: Result<SocketAddr, SidecarError>) -> Result<u16, SidecarError> {
    match bound?.port() {
        0 => Err(SidecarError::PortDiscovery(
            "listener reports port 0".to_string(),
        )),
        port => Ok(port),
    }
}

fn handle_join(
    task: &str,
    result: Result<Result<(), SidecarError>, tokio::task::JoinError>,
) -> Result<(), SidecarError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(SidecarError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// Install the `RUST_LOG`-filtered subscriber shared by both processes.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_zero_is_a_discovery_failure() {
        let bound = Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
        assert!(matches!(
            discover_port(bound),
            Err(SidecarError::PortDiscovery(_))
        ));
    }

    #[test]
    fn address_errors_propagate() {
        let bound = Err(SidecarError::PortDiscovery("no address".to_string()));
        assert!(discover_port(bound).is_err());
    }

    #[test]
    fn config_targets_loopback() {
        let config = SupervisorConfig::for_core_port(47000, RunMode::Diagnostic);
        assert_eq!(config.core_addr.to_string(), "127.0.0.1:47000");
        assert_eq!(config.pid, std::process::id());
    }
}
