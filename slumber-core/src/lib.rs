//! Slumber core library: shared domain types and configuration.
//!
//! - [`types`]: wire values, sync state, devices, sidecar records
//! - [`config`]: YAML configuration load / save / validate
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{
    Automation, ControlMessage, Device, DeviceClass, NotificationId, OscValue, Provenance,
    RegistrationRecord, RunMode, SyncField, SyncState,
};
