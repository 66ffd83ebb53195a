//! UART receive loop of the firmware.

use m5synth_metrics::metric_defs;
use m5synth_protocol::FrameCodec;

use crate::dispatcher::Dispatcher;
use crate::driver::SynthDriver;

/// A synth unit as seen from its serial port.
///
/// Bytes from the host are fed in as they arrive; every complete frame is
/// dispatched and its framed response appended to the returned bytes.
#[derive(Debug)]
pub struct FirmwareDevice<D> {
    codec: FrameCodec,
    dispatcher: Dispatcher<D>,
    bad_frames: u64,
}

impl<D: SynthDriver> FirmwareDevice<D> {
    /// Wrap a dispatcher.
    pub fn new(dispatcher: Dispatcher<D>) -> Self {
        FirmwareDevice {
            codec: FrameCodec::device(),
            dispatcher,
            bad_frames: 0,
        }
    }

    /// Consume received bytes and return the bytes to transmit.
    pub fn feed(&mut self, data: &[u8]) -> Vec<u8> {
        self.codec.push(data);

        let mut out = Vec::new();
        loop {
            match self.codec.decode() {
                Ok(Some(frame)) => {
                    let response = self.dispatcher.handle(frame.id, &frame.payload);
                    out.extend_from_slice(&response.to_frame());
                }
                Ok(None) => break,
                Err(e) => {
                    self.bad_frames += 1;
                    log::warn!("[{}] dropping frame: {}", self.dispatcher.name(), e);
                    metrics::counter!(
                        metric_defs::DEVICE_BAD_FRAMES.name,
                        "device" => self.dispatcher.name().to_string()
                    )
                    .increment(1);
                }
            }
        }
        out
    }

    /// Frames dropped because of an illegal length field.
    pub fn bad_frames(&self) -> u64 {
        self.bad_frames
    }

    /// The dispatcher behind the serial port.
    pub fn dispatcher(&self) -> &Dispatcher<D> {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<D> {
        &mut self.dispatcher
    }

    /// Unwrap the dispatcher.
    pub fn into_dispatcher(self) -> Dispatcher<D> {
        self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use m5synth_protocol::*;

    fn device() -> FirmwareDevice<RecordingDriver> {
        FirmwareDevice::new(Dispatcher::new(Profile::Canonical).named("test"))
    }

    #[test]
    fn test_note_on_end_to_end() {
        let mut dev = device();
        let begin = Command::Begin { rx_pin: 13, tx_pin: 14, baud: 31250 }
            .encode(Profile::Canonical)
            .unwrap();
        assert_eq!(dev.feed(&begin.to_frame()), vec![b'>', 2, 0, 0x01, 0x01]);

        let note = Request::new(0x03, vec![0x00, 0x3C, 0x64]).unwrap();
        let out = dev.feed(&note.to_frame());
        assert_eq!(out, vec![b'>', 2, 0, 0x03, 0x01]);
        assert_eq!(
            dev.dispatcher().driver().unwrap().calls()[1],
            Command::SetNoteOn { channel: 0, pitch: 60, velocity: 100 }
        );
    }

    #[test]
    fn test_split_and_batched_input() {
        let mut dev = device();
        let mut stream = Request::new(CMD_BEGIN, Vec::new()).unwrap().to_frame();
        stream.extend(Request::new(CMD_SET_PAN, vec![0, 64]).unwrap().to_frame());
        stream.extend(Request::new(0x7F, Vec::new()).unwrap().to_frame());

        let (head, tail) = stream.split_at(5);
        let mut out = dev.feed(head);
        out.extend(dev.feed(tail));

        let mut host = FrameCodec::host();
        host.push(&out);
        let mut statuses = Vec::new();
        while let Some(frame) = host.decode().unwrap() {
            statuses.push((frame.id, frame.payload));
        }
        assert_eq!(
            statuses,
            vec![(CMD_BEGIN, vec![1]), (CMD_SET_PAN, vec![1]), (0x7F, vec![0])]
        );
    }

    #[test]
    fn test_bad_length_skipped() {
        let mut dev = device();
        let mut input = vec![b'<', 0, 0, b'<', 0xFF, 0x00];
        input.extend(Request::new(CMD_BEGIN, Vec::new()).unwrap().to_frame());

        let out = dev.feed(&input);
        assert_eq!(out, vec![b'>', 2, 0, CMD_BEGIN, 1]);
        assert_eq!(dev.bad_frames(), 2);
    }
}
