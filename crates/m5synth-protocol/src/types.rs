//! Common types used in the protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::EQ_BANDS;
use crate::error::ProtocolError;

/// Symbolic name of every operation the firmware understands.
///
/// The identifier an operation travels under depends on the [`Profile`];
/// the operation itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Construct the driver and open the UART link to the chip.
    Begin,
    /// Select an instrument for a channel.
    SetInstrument,
    /// Start a note.
    SetNoteOn,
    /// Stop a note.
    SetNoteOff,
    /// Stop all notes on a channel.
    SetAllNotesOff,
    /// Set pitch bend.
    SetPitchBend,
    /// Set pitch bend range.
    SetPitchBendRange,
    /// Set master volume.
    SetMasterVolume,
    /// Set channel volume.
    SetChannelVolume,
    /// Set channel expression.
    SetExpression,
    /// Configure reverb.
    SetReverb,
    /// Configure chorus.
    SetChorus,
    /// Set stereo pan.
    SetPan,
    /// Configure the equalizer.
    SetEqualizer,
    /// Set fine/coarse tuning.
    SetTuning,
    /// Configure vibrato.
    SetVibrato,
    /// Configure the TVF filter.
    SetFilter,
    /// Configure the amplitude envelope.
    SetEnvelope,
    /// Configure modulation wheel routing.
    SetModWheel,
    /// Switch every channel to drums.
    SetAllDrums,
    /// Restore synthesizer defaults.
    Reset,
}

impl Operation {
    /// Every operation, in canonical identifier order.
    pub const ALL: [Operation; 21] = [
        Operation::Begin,
        Operation::SetInstrument,
        Operation::SetNoteOn,
        Operation::SetNoteOff,
        Operation::SetAllNotesOff,
        Operation::SetPitchBend,
        Operation::SetPitchBendRange,
        Operation::SetMasterVolume,
        Operation::SetChannelVolume,
        Operation::SetExpression,
        Operation::SetReverb,
        Operation::SetChorus,
        Operation::SetPan,
        Operation::SetEqualizer,
        Operation::SetTuning,
        Operation::SetVibrato,
        Operation::SetFilter,
        Operation::SetEnvelope,
        Operation::SetModWheel,
        Operation::SetAllDrums,
        Operation::Reset,
    ];

    /// Stable snake_case name used by scripts, the CLI and metric labels.
    pub const fn name(&self) -> &'static str {
        match self {
            Operation::Begin => "begin",
            Operation::SetInstrument => "set_instrument",
            Operation::SetNoteOn => "set_note_on",
            Operation::SetNoteOff => "set_note_off",
            Operation::SetAllNotesOff => "set_all_notes_off",
            Operation::SetPitchBend => "set_pitch_bend",
            Operation::SetPitchBendRange => "set_pitch_bend_range",
            Operation::SetMasterVolume => "set_master_volume",
            Operation::SetChannelVolume => "set_channel_volume",
            Operation::SetExpression => "set_expression",
            Operation::SetReverb => "set_reverb",
            Operation::SetChorus => "set_chorus",
            Operation::SetPan => "set_pan",
            Operation::SetEqualizer => "set_equalizer",
            Operation::SetTuning => "set_tuning",
            Operation::SetVibrato => "set_vibrato",
            Operation::SetFilter => "set_filter",
            Operation::SetEnvelope => "set_envelope",
            Operation::SetModWheel => "set_mod_wheel",
            Operation::SetAllDrums => "set_all_drums",
            Operation::Reset => "reset",
        }
    }

    /// Look an operation up by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::from_name(s).ok_or_else(|| ProtocolError::UnknownOperation(s.to_string()))
    }
}

/// Which command table is in effect.
///
/// The two tables assign different identifiers to overlapping operations and
/// must never be mixed on one link: the firmware flashed on the device decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Full command set with explicit UART pins (identifiers 0x01..=0x15).
    #[default]
    Canonical,
    /// Older firmware revision with a smaller command set.
    Legacy,
}

impl Profile {
    /// Lowercase name of the profile.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Profile::Canonical => "canonical",
            Profile::Legacy => "legacy",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "canonical" => Ok(Profile::Canonical),
            "legacy" => Ok(Profile::Legacy),
            _ => Err(ProtocolError::UnknownProfile(s.to_string())),
        }
    }
}

/// Four-band equalizer settings for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equalizer {
    /// Gain of each band (low, mid-low, mid-high, high).
    pub band_gains: [u8; EQ_BANDS],
    /// Centre frequency index of each band.
    pub band_freqs: [u8; EQ_BANDS],
}

/// Modulation wheel routing depths for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModWheel {
    /// Pitch control.
    pub pitch: u8,
    /// TVF cutoff control.
    pub tvf_cutoff: u8,
    /// Amplitude control.
    pub amplitude: u8,
    /// LFO rate.
    pub rate: u8,
    /// LFO pitch depth.
    pub pitch_depth: u8,
    /// LFO TVF depth.
    pub tvf_depth: u8,
    /// LFO TVA depth.
    pub tva_depth: u8,
}
