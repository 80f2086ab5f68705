//! Main-process runtime: OSC bridge, sync engine and the sidecar RPC endpoint.

mod error;
pub mod launcher;
pub mod services;
pub mod status;
mod runtime;

pub use error::DaemonError;
pub use launcher::launch_sidecar;
pub use runtime::{run, run_until, start_blocking, Endpoints};
pub use services::{AutomationService, ConfiguredDevices, SleepService};
pub use status::DaemonStatus;
