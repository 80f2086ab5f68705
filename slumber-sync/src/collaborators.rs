//! Seams to the rest of the application.
//!
//! Implementations must not block; anything slow should be handed off to
//! its own task.

use std::sync::Arc;

use slumber_core::{Automation, Device, Provenance};

/// Sleep mode on/off.
pub trait SleepControl: Send + Sync {
    fn enable_sleep_mode(&self, provenance: Provenance);
    fn disable_sleep_mode(&self, provenance: Provenance);
}

/// Enabled flag of automation configs.
pub trait AutomationSettings: Send + Sync {
    fn set_automation_enabled(&self, automation: Automation, enabled: bool, provenance: Provenance);
}

/// Device enumeration and power control.
pub trait DeviceControl: Send + Sync {
    fn devices(&self) -> Vec<Device>;
    fn power_off(&self, devices: &[Device]);
}

/// The set of collaborators the dispatcher drives.
#[derive(Clone)]
pub struct Collaborators {
    pub sleep: Arc<dyn SleepControl>,
    pub automations: Arc<dyn AutomationSettings>,
    pub devices: Arc<dyn DeviceControl>,
}
