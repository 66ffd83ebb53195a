//! Host side of the M5Unit-Synth serial protocol.
//!
//! [`SynthClient`] exposes one method per synthesizer operation. Each call
//! validates its arguments against the active command table, sends a single
//! request over a [`Transport`], and blocks for the response.
//!
//! ```rust
//! use m5synth_firmware::{Dispatcher, FirmwareDevice, VirtualSynth};
//! use m5synth_host::{LoopbackTransport, SynthClient};
//! use m5synth_protocol::Profile;
//!
//! let device = FirmwareDevice::new(Dispatcher::<VirtualSynth>::new(Profile::Canonical));
//! let mut synth = SynthClient::new(LoopbackTransport::new(device));
//! assert!(synth.begin(13, 14, 31250)?);
//! synth.set_instrument(0, 0, 24)?;
//! synth.set_note_on(0, 60, 100)?;
//! # Ok::<(), m5synth_host::HostError>(())
//! ```

mod client;
mod error;
mod transport;

pub use client::SynthClient;
pub use error::{HostError, Result, TransportError};
pub use transport::{LoopbackTransport, StreamTransport, Transport, DEFAULT_TIMEOUT};
