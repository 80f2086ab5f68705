//! # slumber-sync
//!
//! Parameter synchronization between the application and the game.
//!
//! [`SyncEngine`] owns the [`SyncState`](slumber_core::SyncState), merges
//! upstream changes queued through an [`EngineHandle`], and broadcasts the
//! full state once per event-loop turn. Inbound messages are routed by
//! [`Routes`] and acted on by the [`CommandDispatcher`].

pub mod collaborators;
pub mod dispatcher;
pub mod engine;
mod error;
pub mod foot_anchor;
pub mod routes;

pub use collaborators::{AutomationSettings, Collaborators, DeviceControl, SleepControl};
pub use dispatcher::{Command, CommandDispatcher, CommandOutcome, POWER_OFF_DELAY};
pub use engine::{EngineEvent, EngineHandle, EngineStats, StatsSnapshot, SyncEngine};
pub use error::SyncError;
pub use routes::{Route, Routes};
