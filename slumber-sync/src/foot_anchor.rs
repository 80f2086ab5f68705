//! Foot-lock release gesture.
//!
//! Toggling `VRCFootAnchor` off and back on makes the game re-seat the
//! player's feet, which is used after the user lies down or gets up.

use std::time::Duration;

use slumber_core::ControlMessage;
use slumber_osc::{OscSink, TransportError};

pub const FOOT_ANCHOR_ADDRESS: &str = "/avatar/parameters/VRCFootAnchor";

const LEAD_IN: Duration = Duration::from_millis(10);
const RELEASE_HOLD: Duration = Duration::from_millis(600);

pub async fn foot_lock_unlock(sink: &impl OscSink) -> Result<(), TransportError> {
    tokio::time::sleep(LEAD_IN).await;
    sink.send(&ControlMessage::bool(FOOT_ANCHOR_ADDRESS, false))?;
    tokio::time::sleep(RELEASE_HOLD).await;
    sink.send(&ControlMessage::bool(FOOT_ANCHOR_ADDRESS, true))?;
    Ok(())
}
