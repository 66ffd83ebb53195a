//! Request/response transports.
//!
//! A [`Transport`] carries one framed request to the device and blocks until
//! the matching framed response comes back. The link is half-duplex: callers
//! never have more than one request outstanding.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use m5synth_firmware::{FirmwareDevice, SynthDriver};
use m5synth_protocol::{Frame, FrameCodec, Request, Response};
use serial2::SerialPort;
use tracing::trace;

use crate::error::TransportError;

/// Default read timeout of stream transports.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// One blocking round trip per call.
pub trait Transport {
    /// Send `request` and wait for its response.
    fn send(&mut self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

fn match_response(request: &Request, frame: Frame) -> Result<Response, TransportError> {
    if frame.id != request.id() {
        return Err(TransportError::UnexpectedResponse {
            expected: request.id(),
            actual: frame.id,
        });
    }
    Ok(Response::try_from(frame)?)
}

// ============================================================================
// Loopback
// ============================================================================

/// In-process transport wired straight into a [`FirmwareDevice`].
#[derive(Debug)]
pub struct LoopbackTransport<D> {
    device: FirmwareDevice<D>,
    codec: FrameCodec,
}

impl<D: SynthDriver> LoopbackTransport<D> {
    /// Connect to a device.
    pub fn new(device: FirmwareDevice<D>) -> Self {
        LoopbackTransport {
            device,
            codec: FrameCodec::host(),
        }
    }

    /// The device on the other end.
    pub fn device(&self) -> &FirmwareDevice<D> {
        &self.device
    }

    /// Mutable access to the device.
    pub fn device_mut(&mut self) -> &mut FirmwareDevice<D> {
        &mut self.device
    }
}

impl<D: SynthDriver> Transport for LoopbackTransport<D> {
    fn send(&mut self, request: &Request) -> Result<Response, TransportError> {
        let reply = self.device.feed(&request.to_frame());
        self.codec.push(&reply);
        match self.codec.decode()? {
            Some(frame) => match_response(request, frame),
            None => Err(TransportError::Closed),
        }
    }
}

// ============================================================================
// Byte streams
// ============================================================================

/// Transport over any byte stream: TCP socket, serial port, or pipe.
///
/// The stream's own read timeout bounds each read. `timeout` is only used to
/// report [`TransportError::Timeout`].
///
/// Bytes already buffered when a request is sent are discarded. A reply to a
/// timed-out request that arrives after the next request has been written is
/// not: it is taken as the next reply, and if both requests share an id it
/// is accepted. Callers that retry after a timeout should reopen the
/// transport or allow the device time to answer before sending again.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    codec: FrameCodec,
    timeout: Duration,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a stream whose read timeout is already configured.
    pub fn new(stream: S, timeout: Duration) -> Self {
        StreamTransport {
            stream,
            codec: FrameCodec::host(),
            timeout,
        }
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    fn read_frame(&mut self) -> Result<Frame, TransportError> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(frame) = self.codec.decode()? {
                return Ok(frame);
            }
            let n = match self.stream.read(&mut buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) =>
                {
                    return Err(TransportError::Timeout(self.timeout));
                }
                Err(e) => return Err(e.into()),
            };
            trace!(bytes = %hex::encode(&buf[..n]), "rx");
            self.codec.push(&buf[..n]);
        }
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, request: &Request) -> Result<Response, TransportError> {
        // Leftovers belong to an earlier request that already failed.
        // Replies still in flight are not covered.
        self.codec.clear();

        let frame = request.to_frame();
        trace!(bytes = %hex::encode(&frame), "tx");
        self.stream.write_all(&frame)?;
        self.stream.flush()?;

        let reply = self.read_frame()?;
        match_response(request, reply)
    }
}

impl StreamTransport<TcpStream> {
    /// Connect to a device server over TCP.
    pub fn connect_tcp(addr: impl ToSocketAddrs, timeout: Duration) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, timeout))
    }
}

impl StreamTransport<SerialPort> {
    /// Open a serial port at `baud`.
    pub fn open_serial(
        path: impl AsRef<Path>,
        baud: u32,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut port = SerialPort::open(path.as_ref(), baud)?;
        port.set_read_timeout(timeout)?;
        Ok(Self::new(port, timeout))
    }
}
