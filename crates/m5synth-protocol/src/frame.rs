//! Frame encoding/decoding utilities.
//!
//! Packets travel over the serial link inside a small frame: a direction
//! header, a 2-byte little-endian length, then the identifier and payload.
//!
//! ```text
//! +--------+--------+--------+----+-------------------+
//! | header | len_lo | len_hi | id | payload[0..len-1] |
//! +--------+--------+--------+----+-------------------+
//! ```
//!
//! The header is `'<'` for host → device and `'>'` for device → host. `len`
//! counts the identifier plus the payload.

use bytes::{Buf, BufMut, BytesMut};

use crate::commands::Request;
use crate::constants::MAX_PAYLOAD_SIZE;
use crate::error::ProtocolError;
use crate::responses::Response;

/// Header byte of host → device frames.
pub const HOST_HEADER: u8 = b'<';
/// Header byte of device → host frames.
pub const DEVICE_HEADER: u8 = b'>';
/// Largest legal value of the length field (identifier + payload).
pub const MAX_FRAME_LEN: usize = 1 + MAX_PAYLOAD_SIZE;

/// Direction a frame travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host → device.
    ToDevice,
    /// Device → host.
    ToHost,
}

impl Direction {
    /// Header byte for this direction.
    pub fn header(&self) -> u8 {
        match self {
            Direction::ToDevice => HOST_HEADER,
            Direction::ToHost => DEVICE_HEADER,
        }
    }

    fn reverse(&self) -> Direction {
        match self {
            Direction::ToDevice => Direction::ToHost,
            Direction::ToHost => Direction::ToDevice,
        }
    }
}

/// A decoded frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command identifier.
    pub id: u8,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl TryFrom<Frame> for Request {
    type Error = ProtocolError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        Request::new(frame.id, frame.payload)
    }
}

impl TryFrom<Frame> for Response {
    type Error = ProtocolError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        Response::new(frame.id, frame.payload)
    }
}

/// A codec for reading and writing framed packets.
///
/// Each side decodes frames travelling towards it and encodes frames
/// travelling the other way.
#[derive(Debug)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Direction of the frames this codec decodes.
    inbound: Direction,
}

impl FrameCodec {
    /// Codec for the host end: decodes `'>'` frames, encodes `'<'` frames.
    pub fn host() -> Self {
        Self::new(Direction::ToHost)
    }

    /// Codec for the device end: decodes `'<'` frames, encodes `'>'` frames.
    pub fn device() -> Self {
        Self::new(Direction::ToDevice)
    }

    fn new(inbound: Direction) -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(4 * (3 + MAX_FRAME_LEN)),
            inbound,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns `Ok(Some(frame))` when a frame is complete and `Ok(None)` when
    /// more data is needed. A frame with an illegal length is consumed and
    /// reported as an error; decoding can continue afterwards.
    pub fn decode(&mut self) -> Result<Option<Frame>, ProtocolError> {
        let header = self.inbound.header();

        // Scan for the header byte, discarding any preceding garbage
        let skip = self
            .buffer
            .iter()
            .position(|&b| b == header)
            .unwrap_or(self.buffer.len());
        if skip > 0 {
            log::trace!("discarding {} bytes before frame header", skip);
            self.buffer.advance(skip);
        }

        // Need at least 3 bytes: header + 2 bytes length
        if self.buffer.len() < 3 {
            return Ok(None);
        }

        let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;
        if len == 0 {
            self.buffer.advance(3);
            return Err(ProtocolError::EmptyFrame);
        }
        if len > MAX_FRAME_LEN {
            self.buffer.advance(3);
            return Err(ProtocolError::FrameTooLong {
                max: MAX_FRAME_LEN,
                actual: len,
            });
        }

        if self.buffer.len() < 3 + len {
            return Ok(None);
        }

        self.buffer.advance(3);
        let id = self.buffer.get_u8();
        let payload = self.buffer.split_to(len - 1).to_vec();

        Ok(Some(Frame { id, payload }))
    }

    /// Encode an outbound frame.
    pub fn encode(&self, id: u8, payload: &[u8]) -> Vec<u8> {
        encode_frame(self.inbound.reverse(), id, payload)
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Encode one frame travelling in `direction`.
pub fn encode_frame(direction: Direction, id: u8, payload: &[u8]) -> Vec<u8> {
    let len = (1 + payload.len()) as u16;
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.push(direction.header());
    buf.put_u16_le(len);
    buf.push(id);
    buf.extend_from_slice(payload);
    buf
}

impl Request {
    /// Frame this request for host → device transmission.
    pub fn to_frame(&self) -> Vec<u8> {
        encode_frame(Direction::ToDevice, self.id(), self.payload())
    }
}

impl Response {
    /// Frame this response for device → host transmission.
    pub fn to_frame(&self) -> Vec<u8> {
        encode_frame(Direction::ToHost, self.id(), self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::Status;

    #[test]
    fn test_request_frame_layout() {
        let request = Request::new(0x03, vec![0x00, 0x3C, 0x64]).unwrap();
        assert_eq!(request.to_frame(), vec![b'<', 4, 0, 0x03, 0x00, 0x3C, 0x64]);

        let empty = Request::new(0x15, Vec::new()).unwrap();
        assert_eq!(empty.to_frame(), vec![b'<', 1, 0, 0x15]);
    }

    #[test]
    fn test_device_decodes_host_frames() {
        let mut codec = FrameCodec::device();
        codec.push(&Request::new(0x08, vec![100]).unwrap().to_frame());
        let frame = codec.decode().unwrap().expect("should decode frame");
        assert_eq!(frame, Frame { id: 0x08, payload: vec![100] });
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_host_ignores_own_direction() {
        // A host codec must not pick up its own '<' frames (e.g. a loopback echo).
        let mut codec = FrameCodec::host();
        codec.push(&Request::new(0x08, vec![100]).unwrap().to_frame());
        assert_eq!(codec.decode().unwrap(), None);
    }

    #[test]
    fn test_frame_codec_partial() {
        let mut codec = FrameCodec::host();
        let encoded = Response::with_status(0x03, Status::Ok).to_frame();

        codec.push(&encoded[..3]);
        assert_eq!(codec.decode().unwrap(), None);

        codec.push(&encoded[3..]);
        let frame = codec.decode().unwrap().expect("should decode frame");
        assert_eq!(frame.id, 0x03);
        assert_eq!(frame.payload, vec![1]);
    }

    #[test]
    fn test_frame_codec_multiple_with_noise() {
        let mut codec = FrameCodec::host();
        codec.push(b"\x00\xFFboot");
        codec.push(&Response::with_status(0x01, Status::Ok).to_frame());
        codec.push(&Response::with_status(0x02, Status::Failed).to_frame());

        assert_eq!(codec.decode().unwrap().unwrap().id, 0x01);
        let second = codec.decode().unwrap().unwrap();
        assert_eq!((second.id, second.payload), (0x02, vec![0]));
        assert_eq!(codec.decode().unwrap(), None);
    }

    #[test]
    fn test_illegal_lengths_are_dropped() {
        let mut codec = FrameCodec::device();
        codec.push(&[b'<', 0, 0]);
        codec.push(&[b'<', 200, 0]);
        codec.push(&Request::new(0x15, Vec::new()).unwrap().to_frame());

        assert_eq!(codec.decode(), Err(ProtocolError::EmptyFrame));
        assert_eq!(
            codec.decode(),
            Err(ProtocolError::FrameTooLong { max: MAX_FRAME_LEN, actual: 200 })
        );
        assert_eq!(codec.decode().unwrap().unwrap().id, 0x15);
    }
}
