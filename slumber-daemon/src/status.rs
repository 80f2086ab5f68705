use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use slumber_sidecar::StatusProvider;
use slumber_sync::EngineHandle;

use crate::services::ConfiguredDevices;

/// Payload served on the main-process `status` call.
pub struct DaemonStatus {
    engine: EngineHandle,
    devices: Arc<ConfiguredDevices>,
    osc_listen: SocketAddr,
    osc_target: SocketAddr,
    started_at: DateTime<Utc>,
}

impl DaemonStatus {
    pub fn new(
        engine: EngineHandle,
        devices: Arc<ConfiguredDevices>,
        osc_listen: SocketAddr,
        osc_target: SocketAddr,
    ) -> Self {
        Self {
            engine,
            devices,
            osc_listen,
            osc_target,
            started_at: Utc::now(),
        }
    }
}

impl StatusProvider for DaemonStatus {
    fn status(&self) -> Value {
        json!({
            "state": self.engine.state(),
            "stats": self.engine.stats(),
            "osc": {
                "listen": self.osc_listen,
                "target": self.osc_target,
            },
            "devices_powered_off": self.devices.powered_off(),
            "started_at": self.started_at,
        })
    }
}
