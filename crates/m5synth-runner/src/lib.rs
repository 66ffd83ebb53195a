//! Runner for the M5Unit-Synth tools.
//!
//! This crate backs the `m5synth` binary:
//!
//! - [`server`]: TCP server exposing simulated synth units.
//! - [`script`]: YAML command scripts, validated before playback.
//! - [`player`]: plays compiled scripts through a host client.
//! - [`table`]: renders a profile's command table.

pub mod error;
pub mod player;
pub mod script;
pub mod server;
pub mod table;

pub use error::{Result, RunnerError};
