//! Launches the overlay sidecar executable.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::broadcast;

use slumber_core::RunMode;

use crate::error::{io_err, DaemonError};

/// Spawn the sidecar, pointed at the main-process RPC port.
///
/// The child is killed when the returned handle is dropped.
pub fn launch_sidecar(
    executable: &Path,
    core_port: u16,
    run_mode: RunMode,
) -> Result<Child, DaemonError> {
    let mut command = Command::new(executable);
    command
        .arg("--core-port")
        .arg(core_port.to_string())
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if run_mode == RunMode::Diagnostic {
        command.arg("--diagnostic");
    }

    let child = command.spawn().map_err(|e| io_err(executable, e))?;
    tracing::info!(
        executable = %executable.display(),
        pid = child.id().unwrap_or_default(),
        core_port,
        "launched overlay sidecar",
    );
    Ok(child)
}

/// Wait for the sidecar to exit or for shutdown, whichever comes first.
///
/// A sidecar exit is logged but does not stop the main process.
pub(crate) async fn sidecar_task(
    mut child: Child,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    tokio::select! {
        _ = shutdown_rx.recv() => {
            if let Err(err) = child.kill().await {
                tracing::warn!(error = %err, "failed to stop overlay sidecar");
            }
        }
        status = child.wait() => {
            match status {
                Ok(status) if status.success() => tracing::info!("overlay sidecar exited"),
                Ok(status) => tracing::warn!(%status, "overlay sidecar exited with failure"),
                Err(err) => tracing::warn!(error = %err, "failed to wait for overlay sidecar"),
            }
        }
    }
    Ok(())
}
