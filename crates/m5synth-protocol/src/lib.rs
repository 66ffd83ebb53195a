//! M5Unit-Synth Serial Command Protocol
//!
//! This crate defines the packets exchanged between a host and the
//! microcontroller firmware that drives a SAM2695 synthesizer module
//! (M5Unit-Synth). Each host call becomes one request packet and the firmware
//! answers with exactly one response packet.
//!
//! # Protocol Overview
//!
//! - **Requests** (host → firmware): a one-byte command identifier followed by
//!   a fixed-layout payload of at most 32 bytes.
//! - **Responses** (firmware → host): the echoed identifier followed by a
//!   payload whose first byte is a status (`1` = success, `0` = failure).
//!
//! Payload layouts live in a single declarative [`CommandSpec`] table per
//! [`Profile`]. The same table drives host-side validation and packing as well
//! as device-side decoding, so the two sides cannot drift apart.
//!
//! # Example
//!
//! ```rust
//! use m5synth_protocol::{Command, Profile};
//!
//! let cmd = Command::SetNoteOn { channel: 0, pitch: 60, velocity: 100 };
//! let request = cmd.encode(Profile::Canonical)?;
//! assert_eq!(request.id(), 0x03);
//! assert_eq!(request.payload(), &[0x00, 0x3C, 0x64]);
//! # Ok::<(), m5synth_protocol::ProtocolError>(())
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod table;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use table::*;
pub use types::*;
