//! Typed synthesizer client.

use std::thread;
use std::time::{Duration, Instant};

use m5synth_metrics::metric_defs;
use m5synth_protocol::{
    encode_fields, Command, Equalizer, ModWheel, Operation, Profile, Response, MIDI_CHANNELS,
};
use tracing::{debug, trace, warn};

use crate::error::{HostError, Result};
use crate::transport::Transport;

/// Host-side handle to one synth unit.
///
/// Every method validates its arguments against the active profile's table
/// before anything is sent, then performs one blocking round trip.
#[derive(Debug)]
pub struct SynthClient<T> {
    transport: T,
    profile: Profile,
}

impl<T: Transport> SynthClient<T> {
    /// Create a client speaking the canonical table.
    pub fn new(transport: T) -> Self {
        Self::with_profile(transport, Profile::Canonical)
    }

    /// Create a client for a specific command table.
    pub fn with_profile(transport: T, profile: Profile) -> Self {
        SynthClient { transport, profile }
    }

    /// Active command table.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn count(operation: Operation, result: &'static str) {
        metrics::counter!(
            metric_defs::HOST_REQUESTS.name,
            "operation" => operation.name(),
            "result" => result
        )
        .increment(1);
    }

    /// Validate, send, and return the raw response regardless of status.
    pub fn request(&mut self, operation: Operation, values: &[i32]) -> Result<Response> {
        let request = match encode_fields(self.profile, operation, values) {
            Ok(request) => request,
            Err(e) => {
                Self::count(operation, "invalid");
                return Err(e.into());
            }
        };
        trace!(
            %operation,
            id = request.id(),
            payload = %hex::encode(request.payload()),
            "sending request"
        );

        let start = Instant::now();
        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => {
                Self::count(operation, "transport_error");
                return Err(e.into());
            }
        };
        let elapsed = start.elapsed();
        metrics::histogram!(
            metric_defs::HOST_ROUND_TRIP.name,
            "operation" => operation.name()
        )
        .record(elapsed.as_micros() as f64);
        debug!(%operation, status = ?response.status(), ?elapsed, "response");

        Ok(response)
    }

    /// Send an operation and require status 1.
    pub fn call(&mut self, operation: Operation, values: &[i32]) -> Result<()> {
        let response = self.request(operation, values)?;
        if response.status().is_ok() {
            Self::count(operation, "ok");
            Ok(())
        } else {
            Self::count(operation, "failed");
            Err(HostError::Failure {
                operation,
                id: response.id(),
                status: response.payload().first().copied().unwrap_or(0),
            })
        }
    }

    /// Send a typed command and require status 1.
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        self.call(command.operation(), &command.values())
    }

    /// Bring up the synth. Returns `Ok(false)` if the device reported a
    /// failure status; transport and validation errors still propagate.
    pub fn begin(&mut self, rx_pin: u8, tx_pin: u8, baud: u16) -> Result<bool> {
        match self.execute(&Command::Begin { rx_pin, tx_pin, baud }) {
            Ok(()) => Ok(true),
            Err(HostError::Failure { status, .. }) => {
                warn!(status, "synth begin reported failure");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Select `instrument` from `bank` on `channel`.
    pub fn set_instrument(&mut self, bank: u8, channel: u8, instrument: u8) -> Result<()> {
        self.execute(&Command::SetInstrument { bank, channel, instrument })
    }

    /// Start a note.
    pub fn set_note_on(&mut self, channel: u8, pitch: u8, velocity: u8) -> Result<()> {
        self.execute(&Command::SetNoteOn { channel, pitch, velocity })
    }

    /// Release a note.
    pub fn set_note_off(&mut self, channel: u8, pitch: u8, velocity: u8) -> Result<()> {
        self.execute(&Command::SetNoteOff { channel, pitch, velocity })
    }

    /// Release every note sounding on `channel`.
    pub fn set_all_notes_off(&mut self, channel: u8) -> Result<()> {
        self.execute(&Command::SetAllNotesOff { channel })
    }

    /// Pitch bend in [-8192, 8191], zero is centre.
    pub fn set_pitch_bend(&mut self, channel: u8, bend: i16) -> Result<()> {
        self.execute(&Command::SetPitchBend { channel, bend })
    }

    /// Bend range in semitones.
    pub fn set_pitch_bend_range(&mut self, channel: u8, range: u8) -> Result<()> {
        self.execute(&Command::SetPitchBendRange { channel, range })
    }

    /// Chip-wide output level.
    pub fn set_master_volume(&mut self, level: u8) -> Result<()> {
        self.execute(&Command::SetMasterVolume { level })
    }

    /// Channel volume (CC 7).
    pub fn set_channel_volume(&mut self, channel: u8, level: u8) -> Result<()> {
        self.execute(&Command::SetChannelVolume { channel, level })
    }

    /// Channel expression (CC 11).
    pub fn set_expression(&mut self, channel: u8, expression: u8) -> Result<()> {
        self.execute(&Command::SetExpression { channel, expression })
    }

    /// Reverb `program` is in [0, 7].
    pub fn set_reverb(&mut self, channel: u8, program: u8, level: u8, feedback: u8) -> Result<()> {
        self.execute(&Command::SetReverb { channel, program, level, feedback })
    }

    /// Chorus `program` is in [0, 7].
    pub fn set_chorus(
        &mut self,
        channel: u8,
        program: u8,
        level: u8,
        feedback: u8,
        delay: u8,
    ) -> Result<()> {
        self.execute(&Command::SetChorus { channel, program, level, feedback, delay })
    }

    /// Stereo position, 64 is centre.
    pub fn set_pan(&mut self, channel: u8, value: u8) -> Result<()> {
        self.execute(&Command::SetPan { channel, value })
    }

    /// Four-band equalizer gains and frequencies.
    pub fn set_equalizer(&mut self, channel: u8, bands: Equalizer) -> Result<()> {
        self.execute(&Command::SetEqualizer { channel, bands })
    }

    /// Fine and coarse tuning, 64 is no offset.
    pub fn set_tuning(&mut self, channel: u8, fine: u8, coarse: u8) -> Result<()> {
        self.execute(&Command::SetTuning { channel, fine, coarse })
    }

    /// Vibrato rate, depth and onset delay.
    pub fn set_vibrato(&mut self, channel: u8, rate: u8, depth: u8, delay: u8) -> Result<()> {
        self.execute(&Command::SetVibrato { channel, rate, depth, delay })
    }

    /// TVF cutoff and resonance.
    pub fn set_filter(&mut self, channel: u8, cutoff: u8, resonance: u8) -> Result<()> {
        self.execute(&Command::SetFilter { channel, cutoff, resonance })
    }

    /// Attack, decay and release times.
    pub fn set_envelope(&mut self, channel: u8, attack: u8, decay: u8, release: u8) -> Result<()> {
        self.execute(&Command::SetEnvelope { channel, attack, decay, release })
    }

    /// Modulation wheel routing.
    pub fn set_mod_wheel(&mut self, channel: u8, wheel: ModWheel) -> Result<()> {
        self.execute(&Command::SetModWheel { channel, wheel })
    }

    /// Put every channel on the drum kit.
    pub fn set_all_drums(&mut self) -> Result<()> {
        self.execute(&Command::SetAllDrums)
    }

    /// Reset the chip. The session stays open.
    pub fn reset(&mut self) -> Result<()> {
        self.execute(&Command::Reset)
    }

    /// Note on, wait `duration`, note off.
    ///
    /// Not atomic: if the thread is interrupted during the wait the note
    /// keeps sounding. Note off is skipped when note on fails.
    pub fn play_note(
        &mut self,
        channel: u8,
        pitch: u8,
        velocity: u8,
        duration: Duration,
    ) -> Result<()> {
        self.set_note_on(channel, pitch, velocity)?;
        thread::sleep(duration);
        self.set_note_off(channel, pitch, 0)
    }

    /// Send all-notes-off on every channel, continuing past failures.
    /// Returns the first error.
    pub fn silence(&mut self) -> Result<()> {
        let mut first_err = None;
        for channel in 0..MIDI_CHANNELS {
            if let Err(e) = self.set_all_notes_off(channel) {
                warn!(channel, error = %e, "all notes off failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use m5synth_protocol::{ProtocolError, Request, Status};

    /// Answers every request with a fixed status and counts sends.
    #[derive(Default)]
    struct Fixed {
        status: Option<Status>,
        sent: Vec<Request>,
    }

    impl Transport for Fixed {
        fn send(&mut self, request: &Request) -> std::result::Result<Response, TransportError> {
            self.sent.push(request.clone());
            match self.status {
                Some(status) => Ok(Response::with_status(request.id(), status)),
                None => Err(TransportError::Closed),
            }
        }
    }

    fn client(status: Option<Status>) -> SynthClient<Fixed> {
        SynthClient::new(Fixed { status, sent: Vec::new() })
    }

    #[test]
    fn test_validation_sends_nothing() {
        let mut c = client(Some(Status::Ok));
        let err = c.set_note_on(16, 60, 100).unwrap_err();
        assert!(matches!(
            err,
            HostError::Protocol(ProtocolError::Validation { field: "channel", value: 16, .. })
        ));
        assert!(c.set_reverb(0, 8, 0, 0).is_err());
        assert!(c.set_pitch_bend(0, 8192).is_err());
        assert!(c.transport().sent.is_empty());
    }

    #[test]
    fn test_failure_status() {
        let mut c = client(Some(Status::Failed));
        match c.set_pan(3, 10) {
            Err(HostError::Failure { operation, id, status }) => {
                assert_eq!(operation, Operation::SetPan);
                assert_eq!(id, 0x0D);
                assert_eq!(status, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_begin_is_lenient() {
        let mut c = client(Some(Status::Failed));
        assert!(!c.begin(13, 14, 31250).unwrap());

        let mut c = client(None);
        assert!(matches!(
            c.begin(13, 14, 31250),
            Err(HostError::Transport(TransportError::Closed))
        ));
    }

    #[test]
    fn test_unsupported_in_legacy() {
        let mut c = SynthClient::with_profile(Fixed::default(), Profile::Legacy);
        assert!(matches!(
            c.set_vibrato(0, 1, 2, 3),
            Err(HostError::Protocol(ProtocolError::Unsupported { .. }))
        ));
        c.transport_mut().status = Some(Status::Ok);
        c.set_master_volume(100).unwrap();
        assert_eq!(c.transport().sent[0].id(), 0x03);
    }

    #[test]
    fn test_play_note_skips_off_on_failure() {
        let mut c = client(Some(Status::Failed));
        assert!(c.play_note(0, 60, 100, Duration::ZERO).is_err());
        assert_eq!(c.transport().sent.len(), 1);

        let mut c = client(Some(Status::Ok));
        c.play_note(0, 60, 100, Duration::from_millis(1)).unwrap();
        let sent = &c.transport().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].payload(), &[0, 60, 0]);
    }

    #[test]
    fn test_silence_tries_every_channel() {
        let mut c = client(Some(Status::Failed));
        assert!(c.silence().is_err());
        assert_eq!(c.transport().sent.len(), 16);
    }
}
