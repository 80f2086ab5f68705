use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, watch};

use slumber_core::{Automation, Config, SyncField};
use slumber_osc::OscReceiver;
use slumber_sidecar::{CoreEndpoint, RpcServer, SidecarRegistry};
use slumber_sync::{Collaborators, CommandDispatcher, EngineHandle, Routes, SyncEngine};

use crate::error::{io_err, DaemonError};
use crate::launcher::{launch_sidecar, sidecar_task};
use crate::services::{AutomationService, ConfiguredDevices, SleepService};
use crate::status::DaemonStatus;

/// Addresses the runtime actually bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub osc: SocketAddr,
    pub rpc: SocketAddr,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    slumber_sidecar::init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon runtime until ctrl-c or a fatal task error.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    run_until(config, shutdown_tx, None).await
}

/// Run the daemon runtime until `shutdown` fires.
///
/// `ready` receives the bound addresses once every listener is up.
pub async fn run_until(
    config: Config,
    shutdown_tx: broadcast::Sender<()>,
    ready: Option<oneshot::Sender<Endpoints>>,
) -> Result<(), DaemonError> {
    config.validate()?;
    let listen = config.osc.listen_addr()?;
    let target = config.osc.target_addr()?;

    let (sender, receiver) = slumber_osc::bind(listen).await.map_err(|err| {
        tracing::error!(
            %listen,
            error = %err,
            "cannot bind OSC listen address; free the port or grant permission to bind it",
        );
        DaemonError::from(err)
    })?;
    let osc_addr = receiver.local_addr().map_err(|e| io_err("osc-socket", e))?;

    let registry = Arc::new(SidecarRegistry::new());
    let sleep = Arc::new(SleepService::new().with_notifier(registry.clone()));
    let automations = Arc::new(AutomationService::new());
    let devices = Arc::new(ConfiguredDevices::new(config.devices.clone()));

    let dispatcher = CommandDispatcher::new(Collaborators {
        sleep: sleep.clone(),
        automations: automations.clone(),
        devices: devices.clone(),
    });
    let (engine, handle) = SyncEngine::new(
        Routes::new(&config.osc.namespace),
        sender.to(target),
        dispatcher,
    );

    let status = Arc::new(DaemonStatus::new(
        handle.clone(),
        devices.clone(),
        osc_addr,
        target,
    ));
    let endpoint = Arc::new(CoreEndpoint::new(registry.clone()).with_status(status));
    let rpc = RpcServer::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, config.rpc.core_port))).await?;
    let rpc_addr = rpc.local_addr()?;
    tracing::info!(osc = %osc_addr, %target, rpc = %rpc_addr, "slumber daemon listening");

    let sidecar = match &config.sidecar.executable {
        Some(executable) => Some(launch_sidecar(
            executable,
            rpc_addr.port(),
            config.sidecar.run_mode,
        )?),
        None => None,
    };

    if let Some(ready) = ready {
        let _ = ready.send(Endpoints {
            osc: osc_addr,
            rpc: rpc_addr,
        });
    }

    let engine_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = engine.run(shutdown_rx).await.map_err(DaemonError::from);
            let _ = shutdown.send(());
            result
        })
    };

    let receive_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let handle = handle.clone();
        tokio::spawn(async move {
            let result = receive_task(receiver, handle, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let upstream_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let sources = UpstreamSources {
            sleep_mode: sleep.subscribe(),
            sleeping_animations: automations.subscribe(Automation::SleepingAnimations),
            status_automations: automations.subscribe(Automation::ChangeStatusBasedOnPlayerCount),
        };
        let handle = handle.clone();
        tokio::spawn(async move {
            let result = upstream_task(sources, handle, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let rpc_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = rpc.serve(endpoint, shutdown_rx).await.map_err(DaemonError::from);
            let _ = shutdown.send(());
            result
        })
    };

    let sidecar_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            match sidecar {
                Some(child) => sidecar_task(child, shutdown_rx).await,
                None => Ok(()),
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
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (engine_result, receive_result, upstream_result, rpc_result, sidecar_result, signal_result) = tokio::join!(
        engine_handle,
        receive_handle,
        upstream_handle,
        rpc_handle,
        sidecar_handle,
        signal_handle
    );

    handle_join("sync_engine", engine_result)?;
    handle_join("osc_receiver", receive_result)?;
    handle_join("upstream", upstream_result)?;
    handle_join("rpc_server", rpc_result)?;
    handle_join("sidecar", sidecar_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn receive_task(
    mut receiver: OscReceiver,
    handle: EngineHandle,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            message = receiver.next() => {
                if handle.deliver(message?).is_err() {
                    tracing::debug!("sync engine stopped, closing OSC receiver");
                    break;
                }
            }
        }
    }
    if receiver.dropped() > 0 {
        tracing::debug!(dropped = receiver.dropped(), "undecodable OSC packets dropped");
    }
    Ok(())
}

struct UpstreamSources {
    sleep_mode: watch::Receiver<bool>,
    sleeping_animations: watch::Receiver<bool>,
    status_automations: watch::Receiver<bool>,
}

/// Forward upstream values into the engine, current values first.
async fn upstream_task(
    mut sources: UpstreamSources,
    handle: EngineHandle,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    handle.set(SyncField::SleepMode, *sources.sleep_mode.borrow_and_update())?;
    handle.set(
        SyncField::SleepingAnimations,
        *sources.sleeping_animations.borrow_and_update(),
    )?;
    handle.set(
        SyncField::StatusAutomations,
        *sources.status_automations.borrow_and_update(),
    )?;

    loop {
        let (field, changed) = tokio::select! {
            _ = shutdown_rx.recv() => break,
            changed = sources.sleep_mode.changed() => (SyncField::SleepMode, changed),
            changed = sources.sleeping_animations.changed() => (SyncField::SleepingAnimations, changed),
            changed = sources.status_automations.changed() => (SyncField::StatusAutomations, changed),
        };
        if changed.is_err() {
            break;
        }
        let value = match field {
            SyncField::SleepMode => *sources.sleep_mode.borrow_and_update(),
            SyncField::SleepingAnimations => *sources.sleeping_animations.borrow_and_update(),
            SyncField::StatusAutomations => *sources.status_automations.borrow_and_update(),
        };
        if handle.set(field, value).is_err() {
            tracing::debug!("sync engine stopped, no longer forwarding upstream changes");
            break;
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}
