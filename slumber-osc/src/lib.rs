//! # slumber-osc
//!
//! Transport adapter for the game's UDP control protocol (OSC 1.0).
//!
//! ## Wire format
//!
//! ```text
//! [address\0 pad4][,tags\0 pad4][arg0][arg1]…
//! ```
//!
//! | Tag | Type | Payload |
//! |-----|------|---------|
//! | `T` / `F` | bool | none |
//! | `i` | int32 | 4 bytes, big-endian |
//! | `f` | float32 | 4 bytes, big-endian IEEE 754 |
//! | `s` | string | NUL-terminated, padded to 4 |
//!
//! `#bundle` packets are flattened into their contained messages.

pub mod codec;
mod error;
pub mod transport;

pub use codec::{decode_packet, encode};
pub use error::{CodecError, TransportError};
pub use transport::{bind, OscReceiver, OscSender, OscSink, OscTarget};
