//! In-process implementations of the sync collaborators.
//!
//! Each service keeps its value in a `watch` channel. The runtime forwards
//! every change into the sync engine, which broadcasts it unless the game
//! already holds that value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use slumber_core::{Automation, Device, Provenance};
use slumber_sidecar::SidecarRegistry;
use slumber_sync::{AutomationSettings, DeviceControl, SleepControl};

pub const SLEEP_NOTIFICATION_DURATION: Duration = Duration::from_secs(5);

pub struct SleepService {
    state: watch::Sender<bool>,
    notifier: Option<Arc<SidecarRegistry>>,
}

impl Default for SleepService {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepService {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state,
            notifier: None,
        }
    }

    /// Post an overlay notification when the game toggles sleep mode.
    pub fn with_notifier(mut self, registry: Arc<SidecarRegistry>) -> Self {
        self.notifier = Some(registry);
        self
    }

    pub fn is_enabled(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    fn apply(&self, enabled: bool, provenance: Provenance) {
        if !replace_if_changed(&self.state, enabled) {
            return;
        }
        tracing::info!(enabled, ?provenance, "sleep mode changed");
        if provenance == Provenance::OscControl {
            self.notify(enabled);
        }
    }

    fn notify(&self, enabled: bool) {
        let Some(registry) = self.notifier.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let message = if enabled {
            "Sleep mode enabled"
        } else {
            "Sleep mode disabled"
        };
        runtime.spawn(async move {
            registry
                .add_notification(message, SLEEP_NOTIFICATION_DURATION)
                .await;
        });
    }
}

impl SleepControl for SleepService {
    fn enable_sleep_mode(&self, provenance: Provenance) {
        self.apply(true, provenance);
    }

    fn disable_sleep_mode(&self, provenance: Provenance) {
        self.apply(false, provenance);
    }
}

/// Enabled flags of the automation configs mirrored over OSC.
pub struct AutomationService {
    sleeping_animations: watch::Sender<bool>,
    status_automations: watch::Sender<bool>,
}

impl Default for AutomationService {
    fn default() -> Self {
        Self::new()
    }
}

impl AutomationService {
    pub fn new() -> Self {
        Self {
            sleeping_animations: watch::channel(false).0,
            status_automations: watch::channel(false).0,
        }
    }

    pub fn is_enabled(&self, automation: Automation) -> bool {
        *self.flag(automation).borrow()
    }

    pub fn subscribe(&self, automation: Automation) -> watch::Receiver<bool> {
        self.flag(automation).subscribe()
    }

    fn flag(&self, automation: Automation) -> &watch::Sender<bool> {
        match automation {
            Automation::SleepingAnimations => &self.sleeping_animations,
            Automation::ChangeStatusBasedOnPlayerCount => &self.status_automations,
        }
    }
}

impl AutomationSettings for AutomationService {
    fn set_automation_enabled(&self, automation: Automation, enabled: bool, provenance: Provenance) {
        if replace_if_changed(self.flag(automation), enabled) {
            tracing::info!(?automation, enabled, ?provenance, "automation toggled");
        }
    }
}

/// Devices listed in the config file.
///
/// Powering off is logged and counted; the VR runtime bridge is not part of
/// this process.
pub struct ConfiguredDevices {
    devices: Vec<Device>,
    powered_off: AtomicU64,
}

impl ConfiguredDevices {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            powered_off: AtomicU64::new(0),
        }
    }

    /// Devices powered off since startup.
    pub fn powered_off(&self) -> u64 {
        self.powered_off.load(Ordering::Relaxed)
    }
}

impl DeviceControl for ConfiguredDevices {
    fn devices(&self) -> Vec<Device> {
        self.devices.clone()
    }

    fn power_off(&self, devices: &[Device]) {
        for device in devices {
            tracing::info!(
                index = device.index,
                class = ?device.class,
                serial = device.serial_number.as_deref().unwrap_or("-"),
                "powering off device",
            );
        }
        self.powered_off
            .fetch_add(devices.len() as u64, Ordering::Relaxed);
    }
}

fn replace_if_changed(state: &watch::Sender<bool>, value: bool) -> bool {
    state.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    })
}
