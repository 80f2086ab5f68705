//! Fixed address table for the control protocol.

use slumber_core::SyncField;

/// Sent by the game whenever the avatar is (re)loaded.
pub const AVATAR_CHANGE: &str = "/avatar/change";

/// Where an inbound address goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Toggle(SyncField),
    Command,
    AvatarChange,
}

/// Addresses under `/avatar/parameters/<namespace>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    sleep_mode: String,
    sleeping_animations: String,
    status_automations: String,
    command: String,
}

impl Routes {
    pub fn new(namespace: &str) -> Self {
        let parameter = |name: &str| format!("/avatar/parameters/{namespace}/{name}");
        Self {
            sleep_mode: parameter(SyncField::SleepMode.parameter_name()),
            sleeping_animations: parameter(SyncField::SleepingAnimations.parameter_name()),
            status_automations: parameter(SyncField::StatusAutomations.parameter_name()),
            command: parameter("Cmd"),
        }
    }

    pub fn field_address(&self, field: SyncField) -> &str {
        match field {
            SyncField::SleepMode => &self.sleep_mode,
            SyncField::SleepingAnimations => &self.sleeping_animations,
            SyncField::StatusAutomations => &self.status_automations,
        }
    }

    pub fn command_address(&self) -> &str {
        &self.command
    }

    /// Match an inbound address. `None` means the message is not ours.
    pub fn route(&self, address: &str) -> Option<Route> {
        if address == AVATAR_CHANGE {
            return Some(Route::AvatarChange);
        }
        if address == self.command {
            return Some(Route::Command);
        }
        SyncField::ALL
            .into_iter()
            .find(|field| self.field_address(*field) == address)
            .map(Route::Toggle)
    }
}
