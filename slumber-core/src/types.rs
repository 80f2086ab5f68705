//! Domain types shared by the OSC bridge and the overlay sidecar.
//!
//! Wire values carry no schema: an address is an opaque routing key and the
//! consumer decides which value type it expects.

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Control messages
// ---------------------------------------------------------------------------

/// One typed argument of a [`ControlMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum OscValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
}

impl OscValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OscValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            OscValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Short type name, used in mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            OscValue::Bool(_) => "bool",
            OscValue::Int(_) => "int32",
            OscValue::Float(_) => "float32",
            OscValue::String(_) => "string",
        }
    }
}

impl fmt::Display for OscValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscValue::Bool(value) => value.fmt(f),
            OscValue::Int(value) => value.fmt(f),
            OscValue::Float(value) => value.fmt(f),
            OscValue::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// An addressed, ordered list of typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub address: String,
    pub values: Vec<OscValue>,
}

impl ControlMessage {
    pub fn new(address: impl Into<String>, values: Vec<OscValue>) -> Self {
        Self {
            address: address.into(),
            values,
        }
    }

    pub fn bool(address: impl Into<String>, value: bool) -> Self {
        Self::new(address, vec![OscValue::Bool(value)])
    }

    pub fn int(address: impl Into<String>, value: i32) -> Self {
        Self::new(address, vec![OscValue::Int(value)])
    }

    pub fn float(address: impl Into<String>, value: f32) -> Self {
        Self::new(address, vec![OscValue::Float(value)])
    }

    /// First argument, if any.
    pub fn first(&self) -> Option<&OscValue> {
        self.values.first()
    }
}

// ---------------------------------------------------------------------------
// Sync state
// ---------------------------------------------------------------------------

/// Snapshot of the parameters mirrored to the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub sleep_mode: bool,
    pub sleeping_animations: bool,
    pub status_automations: bool,
}

impl SyncState {
    pub fn get(&self, field: SyncField) -> bool {
        match field {
            SyncField::SleepMode => self.sleep_mode,
            SyncField::SleepingAnimations => self.sleeping_animations,
            SyncField::StatusAutomations => self.status_automations,
        }
    }

    /// Set `field` to `value`. Returns `true` when the stored value changed.
    pub fn set(&mut self, field: SyncField, value: bool) -> bool {
        let slot = match field {
            SyncField::SleepMode => &mut self.sleep_mode,
            SyncField::SleepingAnimations => &mut self.sleeping_animations,
            SyncField::StatusAutomations => &mut self.status_automations,
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }
}

/// The three tracked fields, in broadcast order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncField {
    SleepMode,
    SleepingAnimations,
    StatusAutomations,
}

impl SyncField {
    pub const ALL: [SyncField; 3] = [
        SyncField::SleepMode,
        SyncField::SleepingAnimations,
        SyncField::StatusAutomations,
    ];

    /// Last segment of the parameter address.
    pub fn parameter_name(self) -> &'static str {
        match self {
            SyncField::SleepMode => "SleepMode",
            SyncField::SleepingAnimations => "SleepingAnimations",
            SyncField::StatusAutomations => "StatusAutomations",
        }
    }
}

impl fmt::Display for SyncField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parameter_name())
    }
}

/// Where a state change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Requested by the game over the control protocol.
    OscControl,
    /// Toggled by the user in the application.
    Manual,
    /// Triggered by an in-process automation.
    Automation,
}

/// Automation configs whose `enabled` flag is mirrored over OSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Automation {
    SleepingAnimations,
    ChangeStatusBasedOnPlayerCount,
}

impl Automation {
    pub fn for_field(field: SyncField) -> Option<Self> {
        match field {
            SyncField::SleepMode => None,
            SyncField::SleepingAnimations => Some(Automation::SleepingAnimations),
            SyncField::StatusAutomations => Some(Automation::ChangeStatusBasedOnPlayerCount),
        }
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Tracked device class as reported by the VR runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Invalid,
    #[serde(rename = "HMD")]
    Hmd,
    Controller,
    GenericTracker,
    TrackingReference,
    DisplayRedirect,
}

/// A device known to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub index: u32,
    pub class: DeviceClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

// ---------------------------------------------------------------------------
// Sidecar
// ---------------------------------------------------------------------------

/// Opaque id of a queued overlay notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for NotificationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The main process's record of a running overlay sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub pid: u32,
    pub endpoint: SocketAddr,
    pub registered_at: DateTime<Utc>,
}

/// How a process reacts to bootstrap failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Handshake failures terminate the process.
    #[default]
    Strict,
    /// Handshake failures are logged and the process keeps running.
    Diagnostic,
}

impl RunMode {
    pub fn exits_on_handshake_failure(self) -> bool {
        matches!(self, RunMode::Strict)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Strict => f.write_str("strict"),
            RunMode::Diagnostic => f.write_str("diagnostic"),
        }
    }
}
