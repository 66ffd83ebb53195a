//! Firmware side of the M5Unit-Synth serial protocol.
//!
//! A [`Dispatcher`] decodes one packet at a time and calls into a
//! [`SynthDriver`]. [`FirmwareDevice`] wraps it with the UART framing so a
//! byte stream can be fed in directly. Two drivers are provided:
//! [`VirtualSynth`] models the chip's state, and [`RecordingDriver`] records
//! the calls it receives.
//!
//! ```rust
//! use m5synth_firmware::{Dispatcher, VirtualSynth};
//! use m5synth_protocol::{Profile, CMD_BEGIN, CMD_SET_NOTE_ON};
//!
//! let mut dispatcher = Dispatcher::<VirtualSynth>::new(Profile::Canonical);
//! assert!(!dispatcher.handle(CMD_SET_NOTE_ON, &[0, 60, 100]).status().is_ok());
//! assert!(dispatcher.handle(CMD_BEGIN, &[]).status().is_ok());
//! assert!(dispatcher.handle(CMD_SET_NOTE_ON, &[0, 60, 100]).status().is_ok());
//! assert_eq!(dispatcher.driver().unwrap().sounding_notes(), 1);
//! ```

mod device;
mod dispatcher;
mod driver;
mod virtual_synth;

pub use device::FirmwareDevice;
pub use dispatcher::{DispatchStats, Dispatcher, DriverFactory, Outcome, SessionState};
pub use driver::{apply, RecordingDriver, SynthDriver};
pub use virtual_synth::{
    ChannelState, Chorus, Envelope, Filter, Reverb, SynthState, UartLink, Vibrato, VirtualSynth,
};
