//! Error types for the host client.

use std::io;
use std::time::Duration;

use m5synth_protocol::{Operation, ProtocolError};
use thiserror::Error;

/// Errors raised while moving one request/response pair.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No complete response within the read timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Peer closed the stream.
    #[error("connection closed")]
    Closed,

    /// Response echoed a different identifier.
    #[error("response id 0x{actual:02X} does not match request id 0x{expected:02X}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    /// Device sent an unparseable frame.
    #[error("framing error: {0}")]
    Frame(#[from] ProtocolError),
}

/// Errors returned by [`SynthClient`](crate::SynthClient).
#[derive(Debug, Error)]
pub enum HostError {
    /// Request rejected before sending.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Round trip failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Device answered with a failure status. The device does not say why.
    #[error("{operation} (0x{id:02X}) failed with status {status}")]
    Failure {
        operation: Operation,
        id: u8,
        status: u8,
    },
}

/// Result alias for client calls.
pub type Result<T> = std::result::Result<T, HostError>;
