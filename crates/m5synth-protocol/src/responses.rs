//! Responses from the synth firmware.

use crate::constants::*;
use crate::error::ProtocolError;

/// Outcome carried in the first response byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The command executed.
    Ok,
    /// The command was not executed. The protocol does not say why: the
    /// device may be uninitialised, the payload malformed, or the identifier
    /// unknown.
    Failed,
}

impl Status {
    /// Whether the command executed.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl From<u8> for Status {
    fn from(code: u8) -> Self {
        match code {
            STATUS_OK => Status::Ok,
            _ => Status::Failed,
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => STATUS_OK,
            Status::Failed => STATUS_FAILED,
        }
    }
}

impl From<bool> for Status {
    fn from(ok: bool) -> Self {
        if ok {
            Status::Ok
        } else {
            Status::Failed
        }
    }
}

/// A response packet: echoed identifier plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: u8,
    payload: Vec<u8>,
}

impl Response {
    /// Create a response, enforcing the payload limit.
    pub fn new(id: u8, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }
        Ok(Response { id, payload })
    }

    /// Single status-byte response, the only shape the firmware produces.
    pub fn with_status(id: u8, status: Status) -> Self {
        Response {
            id,
            payload: vec![status.into()],
        }
    }

    /// Echoed command identifier.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Status byte. An empty payload counts as a failure.
    pub fn status(&self) -> Status {
        self.payload
            .first()
            .copied()
            .map(Status::from)
            .unwrap_or(Status::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_byte() {
        assert_eq!(Response::with_status(3, Status::Ok).payload(), &[1]);
        assert_eq!(Response::with_status(3, Status::Failed).payload(), &[0]);
        assert_eq!(Response::new(3, vec![1, 9]).unwrap().status(), Status::Ok);
        assert_eq!(Response::new(3, vec![2]).unwrap().status(), Status::Failed);
        assert_eq!(Response::new(3, Vec::new()).unwrap().status(), Status::Failed);
    }
}
