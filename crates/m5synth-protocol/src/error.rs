//! Protocol error types.

use thiserror::Error;

use crate::types::{Operation, Profile};

/// Errors that can occur when building, parsing or framing packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An argument is outside the range declared for its field.
    #[error("{operation}: {field}={value} out of range [{min}, {max}]")]
    Validation {
        /// Operation being encoded.
        operation: Operation,
        /// Offending field name.
        field: &'static str,
        /// Value that was supplied.
        value: i32,
        /// Lowest permitted value.
        min: i32,
        /// Highest permitted value.
        max: i32,
    },

    /// The operation has no identifier in the selected table.
    #[error("{operation} is not part of the {profile} command table")]
    Unsupported {
        /// Requested operation.
        operation: Operation,
        /// Selected profile.
        profile: Profile,
    },

    /// Wrong number of field values for an operation.
    #[error("{operation}: expected {expected} values, got {actual}")]
    Arity {
        /// Operation being encoded or decoded.
        operation: Operation,
        /// Number of fields in the table.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// Payload exceeds the packet limit.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Frame declared a zero length, so it carries no identifier.
    #[error("empty frame")]
    EmptyFrame,

    /// Frame declared a length beyond identifier plus maximum payload.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Declared length.
        actual: usize,
    },

    /// Operation name not recognised.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Profile name not recognised.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
}
