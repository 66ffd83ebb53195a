//! Runner error type.

use std::io;

use m5synth_host::{HostError, TransportError};
use m5synth_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the `m5synth` commands.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The device or client rejected a request.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Opening the link failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading a script or serving a socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The script is not valid YAML for the script schema.
    #[error("invalid script: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Rendering JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A script step failed validation.
    #[error("step {step}: {source}")]
    Script {
        /// 1-based step number.
        step: usize,
        #[source]
        source: ProtocolError,
    },

    /// The Ctrl-C handler could not be installed.
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Playback stopped by Ctrl-C.
    #[error("interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, RunnerError>;
