//! Commands that can be sent to the synth firmware.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::table::encode_fields;
use crate::types::*;

/// A request packet: identifier plus payload.
///
/// Built once per call and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: u8,
    payload: Vec<u8>,
}

impl Request {
    /// Create a request, enforcing the payload limit.
    pub fn new(id: u8, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }
        Ok(Request { id, payload })
    }

    /// Command identifier.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Typed commands, one variant per [`Operation`].
///
/// Field types are the wire types. Narrower ranges (channel 0-15, 7-bit
/// values, signed 14-bit bend) are enforced by [`Command::encode`] through the
/// command table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Construct the driver and open its UART.
    Begin {
        /// UART RX pin on the microcontroller.
        rx_pin: u8,
        /// UART TX pin on the microcontroller.
        tx_pin: u8,
        /// Baud rate of the synth link.
        baud: u16,
    },

    /// Select an instrument.
    SetInstrument {
        /// Bank (usually 0).
        bank: u8,
        /// MIDI channel.
        channel: u8,
        /// General MIDI program number.
        instrument: u8,
    },

    /// Start a note.
    SetNoteOn {
        /// MIDI channel.
        channel: u8,
        /// MIDI note number.
        pitch: u8,
        /// Note-on velocity.
        velocity: u8,
    },

    /// Stop a note.
    SetNoteOff {
        /// MIDI channel.
        channel: u8,
        /// MIDI note number.
        pitch: u8,
        /// Release velocity.
        velocity: u8,
    },

    /// Stop all notes on a channel.
    SetAllNotesOff {
        /// MIDI channel.
        channel: u8,
    },

    /// Set pitch bend, centred on zero.
    SetPitchBend {
        /// MIDI channel.
        channel: u8,
        /// Bend amount in [-8192, 8191].
        bend: i16,
    },

    /// Set pitch bend range.
    SetPitchBendRange {
        /// MIDI channel.
        channel: u8,
        /// Range in semitones.
        range: u8,
    },

    /// Set master volume.
    SetMasterVolume {
        /// Volume level.
        level: u8,
    },

    /// Set channel volume.
    SetChannelVolume {
        /// MIDI channel.
        channel: u8,
        /// Volume level.
        level: u8,
    },

    /// Set channel expression.
    SetExpression {
        /// MIDI channel.
        channel: u8,
        /// Expression level.
        expression: u8,
    },

    /// Configure reverb.
    SetReverb {
        /// MIDI channel.
        channel: u8,
        /// Reverb type (0-7).
        program: u8,
        /// Send level.
        level: u8,
        /// Delay feedback.
        feedback: u8,
    },

    /// Configure chorus.
    SetChorus {
        /// MIDI channel.
        channel: u8,
        /// Chorus type (0-7).
        program: u8,
        /// Send level.
        level: u8,
        /// Feedback.
        feedback: u8,
        /// Chorus delay.
        delay: u8,
    },

    /// Set stereo pan (64 = centre).
    SetPan {
        /// MIDI channel.
        channel: u8,
        /// Pan position.
        value: u8,
    },

    /// Configure the equalizer.
    SetEqualizer {
        /// MIDI channel.
        channel: u8,
        /// Band gains and frequencies.
        bands: Equalizer,
    },

    /// Set fine/coarse tuning (64 = no change).
    SetTuning {
        /// MIDI channel.
        channel: u8,
        /// Fine tuning.
        fine: u8,
        /// Coarse tuning.
        coarse: u8,
    },

    /// Configure vibrato.
    SetVibrato {
        /// MIDI channel.
        channel: u8,
        /// Vibrato rate.
        rate: u8,
        /// Vibrato depth.
        depth: u8,
        /// Vibrato onset delay.
        delay: u8,
    },

    /// Configure the TVF filter.
    SetFilter {
        /// MIDI channel.
        channel: u8,
        /// Cutoff.
        cutoff: u8,
        /// Resonance.
        resonance: u8,
    },

    /// Configure the amplitude envelope.
    SetEnvelope {
        /// MIDI channel.
        channel: u8,
        /// Attack time.
        attack: u8,
        /// Decay time.
        decay: u8,
        /// Release time.
        release: u8,
    },

    /// Configure modulation wheel routing.
    SetModWheel {
        /// MIDI channel.
        channel: u8,
        /// Routing depths.
        wheel: ModWheel,
    },

    /// Switch every channel to drums.
    SetAllDrums,

    /// Restore synthesizer defaults.
    Reset,
}

impl Command {
    /// The operation this command performs.
    pub fn operation(&self) -> Operation {
        match self {
            Command::Begin { .. } => Operation::Begin,
            Command::SetInstrument { .. } => Operation::SetInstrument,
            Command::SetNoteOn { .. } => Operation::SetNoteOn,
            Command::SetNoteOff { .. } => Operation::SetNoteOff,
            Command::SetAllNotesOff { .. } => Operation::SetAllNotesOff,
            Command::SetPitchBend { .. } => Operation::SetPitchBend,
            Command::SetPitchBendRange { .. } => Operation::SetPitchBendRange,
            Command::SetMasterVolume { .. } => Operation::SetMasterVolume,
            Command::SetChannelVolume { .. } => Operation::SetChannelVolume,
            Command::SetExpression { .. } => Operation::SetExpression,
            Command::SetReverb { .. } => Operation::SetReverb,
            Command::SetChorus { .. } => Operation::SetChorus,
            Command::SetPan { .. } => Operation::SetPan,
            Command::SetEqualizer { .. } => Operation::SetEqualizer,
            Command::SetTuning { .. } => Operation::SetTuning,
            Command::SetVibrato { .. } => Operation::SetVibrato,
            Command::SetFilter { .. } => Operation::SetFilter,
            Command::SetEnvelope { .. } => Operation::SetEnvelope,
            Command::SetModWheel { .. } => Operation::SetModWheel,
            Command::SetAllDrums => Operation::SetAllDrums,
            Command::Reset => Operation::Reset,
        }
    }

    /// Field values in table order.
    pub fn values(&self) -> Vec<i32> {
        let v = |bytes: &[u8]| bytes.iter().map(|&b| b as i32).collect::<Vec<_>>();
        match *self {
            Command::Begin { rx_pin, tx_pin, baud } => vec![rx_pin as i32, tx_pin as i32, baud as i32],
            Command::SetInstrument { bank, channel, instrument } => v(&[bank, channel, instrument]),
            Command::SetNoteOn { channel, pitch, velocity }
            | Command::SetNoteOff { channel, pitch, velocity } => v(&[channel, pitch, velocity]),
            Command::SetAllNotesOff { channel } => v(&[channel]),
            Command::SetPitchBend { channel, bend } => vec![channel as i32, bend as i32],
            Command::SetPitchBendRange { channel, range } => v(&[channel, range]),
            Command::SetMasterVolume { level } => v(&[level]),
            Command::SetChannelVolume { channel, level } => v(&[channel, level]),
            Command::SetExpression { channel, expression } => v(&[channel, expression]),
            Command::SetReverb { channel, program, level, feedback } => {
                v(&[channel, program, level, feedback])
            }
            Command::SetChorus { channel, program, level, feedback, delay } => {
                v(&[channel, program, level, feedback, delay])
            }
            Command::SetPan { channel, value } => v(&[channel, value]),
            Command::SetEqualizer { channel, bands } => {
                let mut values = vec![channel as i32];
                values.extend(v(&bands.band_gains));
                values.extend(v(&bands.band_freqs));
                values
            }
            Command::SetTuning { channel, fine, coarse } => v(&[channel, fine, coarse]),
            Command::SetVibrato { channel, rate, depth, delay } => v(&[channel, rate, depth, delay]),
            Command::SetFilter { channel, cutoff, resonance } => v(&[channel, cutoff, resonance]),
            Command::SetEnvelope { channel, attack, decay, release } => {
                v(&[channel, attack, decay, release])
            }
            Command::SetModWheel { channel, wheel } => v(&[
                channel,
                wheel.pitch,
                wheel.tvf_cutoff,
                wheel.amplitude,
                wheel.rate,
                wheel.pitch_depth,
                wheel.tvf_depth,
                wheel.tva_depth,
            ]),
            Command::SetAllDrums | Command::Reset => Vec::new(),
        }
    }

    /// Validate and encode the command for the given table.
    pub fn encode(&self, profile: Profile) -> Result<Request, ProtocolError> {
        encode_fields(profile, self.operation(), &self.values())
    }

    /// Rebuild a command from decoded field values.
    ///
    /// Values are narrowed to the wire types without range checks, matching
    /// what the firmware hands its driver.
    pub fn from_values(operation: Operation, values: &[i32]) -> Result<Command, ProtocolError> {
        let expected = match operation {
            Operation::SetAllDrums | Operation::Reset => 0,
            Operation::SetAllNotesOff | Operation::SetMasterVolume => 1,
            Operation::SetPitchBend
            | Operation::SetPitchBendRange
            | Operation::SetChannelVolume
            | Operation::SetExpression
            | Operation::SetPan => 2,
            Operation::Begin
            | Operation::SetInstrument
            | Operation::SetNoteOn
            | Operation::SetNoteOff
            | Operation::SetTuning
            | Operation::SetFilter => 3,
            Operation::SetReverb | Operation::SetVibrato | Operation::SetEnvelope => 4,
            Operation::SetChorus => 5,
            Operation::SetModWheel => 8,
            Operation::SetEqualizer => 9,
        };
        if values.len() != expected {
            return Err(ProtocolError::Arity {
                operation,
                expected,
                actual: values.len(),
            });
        }

        let b = |i: usize| values[i] as u8;
        let command = match operation {
            Operation::Begin => Command::Begin {
                rx_pin: b(0),
                tx_pin: b(1),
                baud: values[2] as u16,
            },
            Operation::SetInstrument => Command::SetInstrument {
                bank: b(0),
                channel: b(1),
                instrument: b(2),
            },
            Operation::SetNoteOn => Command::SetNoteOn {
                channel: b(0),
                pitch: b(1),
                velocity: b(2),
            },
            Operation::SetNoteOff => Command::SetNoteOff {
                channel: b(0),
                pitch: b(1),
                velocity: b(2),
            },
            Operation::SetAllNotesOff => Command::SetAllNotesOff { channel: b(0) },
            Operation::SetPitchBend => Command::SetPitchBend {
                channel: b(0),
                bend: values[1] as i16,
            },
            Operation::SetPitchBendRange => Command::SetPitchBendRange {
                channel: b(0),
                range: b(1),
            },
            Operation::SetMasterVolume => Command::SetMasterVolume { level: b(0) },
            Operation::SetChannelVolume => Command::SetChannelVolume {
                channel: b(0),
                level: b(1),
            },
            Operation::SetExpression => Command::SetExpression {
                channel: b(0),
                expression: b(1),
            },
            Operation::SetReverb => Command::SetReverb {
                channel: b(0),
                program: b(1),
                level: b(2),
                feedback: b(3),
            },
            Operation::SetChorus => Command::SetChorus {
                channel: b(0),
                program: b(1),
                level: b(2),
                feedback: b(3),
                delay: b(4),
            },
            Operation::SetPan => Command::SetPan {
                channel: b(0),
                value: b(1),
            },
            Operation::SetEqualizer => Command::SetEqualizer {
                channel: b(0),
                bands: Equalizer {
                    band_gains: [b(1), b(2), b(3), b(4)],
                    band_freqs: [b(5), b(6), b(7), b(8)],
                },
            },
            Operation::SetTuning => Command::SetTuning {
                channel: b(0),
                fine: b(1),
                coarse: b(2),
            },
            Operation::SetVibrato => Command::SetVibrato {
                channel: b(0),
                rate: b(1),
                depth: b(2),
                delay: b(3),
            },
            Operation::SetFilter => Command::SetFilter {
                channel: b(0),
                cutoff: b(1),
                resonance: b(2),
            },
            Operation::SetEnvelope => Command::SetEnvelope {
                channel: b(0),
                attack: b(1),
                decay: b(2),
                release: b(3),
            },
            Operation::SetModWheel => Command::SetModWheel {
                channel: b(0),
                wheel: ModWheel {
                    pitch: b(1),
                    tvf_cutoff: b(2),
                    amplitude: b(3),
                    rate: b(4),
                    pitch_depth: b(5),
                    tvf_depth: b(6),
                    tva_depth: b(7),
                },
            },
            Operation::SetAllDrums => Command::SetAllDrums,
            Operation::Reset => Command::Reset,
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_encoding() {
        let cmd = Command::SetNoteOn {
            channel: 0,
            pitch: 60,
            velocity: 100,
        };
        let canonical = cmd.encode(Profile::Canonical).unwrap();
        assert_eq!(canonical.id(), CMD_SET_NOTE_ON);
        assert_eq!(canonical.payload(), &[0x00, 0x3C, 0x64]);

        let legacy = cmd.encode(Profile::Legacy).unwrap();
        assert_eq!(legacy.id(), LEGACY_CMD_SET_NOTE_ON);
        assert_eq!(legacy.payload(), &[0x00, 0x3C, 0x64]);
    }

    #[test]
    fn test_channel_out_of_range() {
        let cmd = Command::SetPan {
            channel: 16,
            value: 64,
        };
        assert_eq!(
            cmd.encode(Profile::Canonical).unwrap_err(),
            ProtocolError::Validation {
                operation: Operation::SetPan,
                field: "channel",
                value: 16,
                min: 0,
                max: 15,
            }
        );
    }

    #[test]
    fn test_bend_out_of_range() {
        let cmd = Command::SetPitchBend {
            channel: 0,
            bend: 8192,
        };
        assert!(matches!(
            cmd.encode(Profile::Canonical),
            Err(ProtocolError::Validation { field: "bend", .. })
        ));
    }

    #[test]
    fn test_equalizer_layout() {
        let cmd = Command::SetEqualizer {
            channel: 2,
            bands: Equalizer {
                band_gains: [1, 2, 3, 4],
                band_freqs: [5, 6, 7, 8],
            },
        };
        let request = cmd.encode(Profile::Canonical).unwrap();
        assert_eq!(request.id(), CMD_SET_EQUALIZER);
        assert_eq!(request.payload(), &[2, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(matches!(
            cmd.encode(Profile::Legacy),
            Err(ProtocolError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_values_rebuild_command() {
        let commands = [
            Command::Begin {
                rx_pin: 33,
                tx_pin: 32,
                baud: 31250,
            },
            Command::SetPitchBend {
                channel: 1,
                bend: -100,
            },
            Command::SetModWheel {
                channel: 3,
                wheel: ModWheel {
                    pitch: 1,
                    tvf_cutoff: 2,
                    amplitude: 3,
                    rate: 4,
                    pitch_depth: 5,
                    tvf_depth: 6,
                    tva_depth: 7,
                },
            },
            Command::SetAllDrums,
        ];
        for cmd in commands {
            let rebuilt = Command::from_values(cmd.operation(), &cmd.values()).unwrap();
            assert_eq!(rebuilt, cmd);
        }
    }

    #[test]
    fn test_value_count_matches_table() {
        for spec in crate::CANONICAL_TABLE {
            let values: Vec<i32> = spec.fields.iter().map(|f| f.min).collect();
            let cmd = Command::from_values(spec.operation, &values).unwrap();
            assert_eq!(cmd.values().len(), spec.fields.len(), "{}", spec.operation);
        }
        assert!(matches!(
            Command::from_values(Operation::SetPan, &[1]),
            Err(ProtocolError::Arity { .. })
        ));
    }

    #[test]
    fn test_request_payload_limit() {
        assert!(Request::new(1, vec![0; MAX_PAYLOAD_SIZE]).is_ok());
        assert!(matches!(
            Request::new(1, vec![0; MAX_PAYLOAD_SIZE + 1]),
            Err(ProtocolError::PayloadTooLong { .. })
        ));
    }
}
