//! Inbound command and toggle handling.
//!
//! | code | command | timing |
//! |------|---------|--------|
//! | 1 | initialize: resync + ack with `0` | immediate |
//! | 2 | power off generic trackers | immediate |
//! | 3 | power off controllers | after [`POWER_OFF_DELAY`] |
//! | 4 | power off every device | after [`POWER_OFF_DELAY`] |

use std::time::Duration;

use tokio::task::JoinSet;

use slumber_core::{Automation, Device, DeviceClass, Provenance, SyncField};

use crate::collaborators::{Collaborators, DeviceControl};

/// Lets the in-game interaction that sent a controller/all-devices command
/// finish before the controllers holding it go dark.
pub const POWER_OFF_DELAY: Duration = Duration::from_millis(2000);

/// Command codes sent on `/avatar/parameters/<App>/Cmd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Initialize,
    DisableTrackers,
    DisableControllers,
    DisableAllDevices,
}

impl Command {
    /// Code written back to acknowledge [`Command::Initialize`].
    pub const ACK: i32 = 0;

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Command::Initialize),
            2 => Some(Command::DisableTrackers),
            3 => Some(Command::DisableControllers),
            4 => Some(Command::DisableAllDevices),
            _ => None,
        }
    }

    /// Device class targeted by a power-off command; `None` means all devices.
    fn device_class(self) -> Option<DeviceClass> {
        match self {
            Command::DisableTrackers => Some(DeviceClass::GenericTracker),
            Command::DisableControllers => Some(DeviceClass::Controller),
            Command::Initialize | Command::DisableAllDevices => None,
        }
    }

    fn is_deferred(self) -> bool {
        matches!(self, Command::DisableControllers | Command::DisableAllDevices)
    }
}

/// What the engine must do after a command was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Re-broadcast the full state and acknowledge.
    Resync,
    /// Devices were powered off right away.
    PoweredOff,
    /// A power-off will fire after the delay.
    Scheduled,
    /// Unknown code.
    Ignored,
}

pub struct CommandDispatcher {
    collaborators: Collaborators,
    power_off_delay: Duration,
    // Dropping the set aborts power-offs that have not fired yet.
    scheduled: JoinSet<()>,
}

impl CommandDispatcher {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            power_off_delay: POWER_OFF_DELAY,
            scheduled: JoinSet::new(),
        }
    }

    pub fn with_power_off_delay(mut self, delay: Duration) -> Self {
        self.power_off_delay = delay;
        self
    }

    /// Act on a command code. Must be called from within a Tokio runtime.
    pub fn dispatch_command(&mut self, code: i32) -> CommandOutcome {
        let Some(command) = Command::from_code(code) else {
            tracing::debug!(code, "ignoring unknown command code");
            return CommandOutcome::Ignored;
        };
        tracing::info!(?command, "received OSC command");

        if command == Command::Initialize {
            return CommandOutcome::Resync;
        }

        let class = command.device_class();
        let devices = self.collaborators.devices.clone();
        if !command.is_deferred() {
            power_off_class(devices.as_ref(), class);
            return CommandOutcome::PoweredOff;
        }

        while self.scheduled.try_join_next().is_some() {}
        let delay = self.power_off_delay;
        self.scheduled.spawn(async move {
            tokio::time::sleep(delay).await;
            power_off_class(devices.as_ref(), class);
        });
        CommandOutcome::Scheduled
    }

    /// Apply an inbound toggle.
    ///
    /// Calls the matching collaborator only when `requested` differs from
    /// `current`; returns whether it did.
    pub fn apply_toggle(&self, field: SyncField, current: bool, requested: bool) -> bool {
        if current == requested {
            return false;
        }
        let provenance = Provenance::OscControl;
        match Automation::for_field(field) {
            None => {
                if requested {
                    tracing::info!("activating sleep mode");
                    self.collaborators.sleep.enable_sleep_mode(provenance);
                } else {
                    tracing::info!("deactivating sleep mode");
                    self.collaborators.sleep.disable_sleep_mode(provenance);
                }
            }
            Some(automation) => {
                tracing::info!(?automation, enabled = requested, "updating automation");
                self.collaborators
                    .automations
                    .set_automation_enabled(automation, requested, provenance);
            }
        }
        true
    }
}

fn power_off_class(control: &dyn DeviceControl, class: Option<DeviceClass>) {
    let targets: Vec<Device> = control
        .devices()
        .into_iter()
        .filter(|device| class.map_or(true, |class| device.class == class))
        .collect();
    tracing::info!(?class, count = targets.len(), "powering off devices");
    if !targets.is_empty() {
        control.power_off(&targets);
    }
}
