//! Declarative command tables.
//!
//! Every command is described once, as an ordered list of [`FieldSpec`]s.
//! The encoder validates and packs from this description, the dispatcher
//! decodes from it, and the tests walk it to generate boundary cases. No
//! operation carries hand-written range checks.

use serde::Serialize;

use crate::commands::Request;
use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::{Operation, Profile};

/// Layout and valid range of one payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Field name, reported in validation errors.
    pub name: &'static str,
    /// Width in bytes (1 or 2). Two-byte fields are little-endian.
    pub width: usize,
    /// Whether the field is two's complement.
    pub signed: bool,
    /// Lowest accepted value (inclusive).
    pub min: i32,
    /// Highest accepted value (inclusive).
    pub max: i32,
    /// Value the firmware substitutes when the field is missing from the payload.
    pub default: Option<i32>,
}

impl FieldSpec {
    /// Unsigned single-byte field.
    pub const fn byte(name: &'static str, min: i32, max: i32) -> Self {
        FieldSpec {
            name,
            width: 1,
            signed: false,
            min,
            max,
            default: None,
        }
    }

    /// Unsigned little-endian 16-bit field.
    pub const fn word(name: &'static str, min: i32, max: i32) -> Self {
        FieldSpec {
            name,
            width: 2,
            signed: false,
            min,
            max,
            default: None,
        }
    }

    /// Signed little-endian 16-bit field.
    pub const fn signed_word(name: &'static str, min: i32, max: i32) -> Self {
        FieldSpec {
            name,
            width: 2,
            signed: true,
            min,
            max,
            default: None,
        }
    }

    /// Make the field optional on decode.
    pub const fn with_default(mut self, default: i32) -> Self {
        self.default = Some(default);
        self
    }

    /// Check a value against the declared range.
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Append `value` to `buf`. The value must already be validated.
    pub fn pack(&self, value: i32, buf: &mut Vec<u8>) {
        match self.width {
            1 => buf.push(value as u8),
            _ => buf.extend_from_slice(&(value as u16).to_le_bytes()),
        }
    }

    /// Read the raw value from exactly `width` bytes. No range check.
    pub fn unpack(&self, bytes: &[u8]) -> i32 {
        match (self.width, self.signed) {
            (1, false) => bytes[0] as i32,
            (1, true) => bytes[0] as i8 as i32,
            (_, false) => u16::from_le_bytes([bytes[0], bytes[1]]) as i32,
            (_, true) => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
        }
    }
}

/// One row of a command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// Operation carried by this row.
    pub operation: Operation,
    /// Wire identifier.
    pub id: u8,
    /// Payload fields in transmission order.
    pub fields: &'static [FieldSpec],
}

impl CommandSpec {
    /// Full payload length when every field is present.
    pub fn payload_len(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }

    /// Shortest payload the firmware will execute: the offset just past the
    /// last field that has no decode default.
    pub fn min_len(&self) -> usize {
        let mut offset = 0;
        let mut min = 0;
        for field in self.fields {
            offset += field.width;
            if field.default.is_none() {
                min = offset;
            }
        }
        min
    }

    /// Validate `values` against the field ranges and pack them into a request.
    ///
    /// Nothing is produced unless every value is in range.
    pub fn encode(&self, values: &[i32]) -> Result<Request, ProtocolError> {
        if values.len() != self.fields.len() {
            return Err(ProtocolError::Arity {
                operation: self.operation,
                expected: self.fields.len(),
                actual: values.len(),
            });
        }

        let mut payload = Vec::with_capacity(self.payload_len());
        for (field, &value) in self.fields.iter().zip(values) {
            if !field.contains(value) {
                return Err(ProtocolError::Validation {
                    operation: self.operation,
                    field: field.name,
                    value,
                    min: field.min,
                    max: field.max,
                });
            }
            field.pack(value, &mut payload);
        }

        Request::new(self.id, payload)
    }

    /// Decode field values at their fixed offsets.
    ///
    /// Returns `None` without touching the payload contents if it is shorter
    /// than [`min_len`](Self::min_len). Missing optional fields take their
    /// defaults. Values are returned raw: ranges are not re-checked.
    pub fn decode(&self, payload: &[u8]) -> Option<Vec<i32>> {
        if payload.len() < self.min_len() {
            return None;
        }

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in self.fields {
            let end = offset + field.width;
            match payload.get(offset..end) {
                Some(bytes) => values.push(field.unpack(bytes)),
                None => values.push(field.default?),
            }
            offset = end;
        }
        Some(values)
    }
}

// ============================================================================
// Field Definitions
// ============================================================================

const CHANNEL: FieldSpec = FieldSpec::byte("channel", 0, (MIDI_CHANNELS - 1) as i32);

const fn midi(name: &'static str) -> FieldSpec {
    FieldSpec::byte(name, 0, 127)
}

const BEGIN_FIELDS: &[FieldSpec] = &[
    FieldSpec::byte("rx_pin", 0, 255).with_default(DEFAULT_RX_PIN as i32),
    FieldSpec::byte("tx_pin", 0, 255).with_default(DEFAULT_TX_PIN as i32),
    FieldSpec::word("baud", 1, 65535).with_default(DEFAULT_BAUD as i32),
];
const INSTRUMENT_FIELDS: &[FieldSpec] = &[midi("bank"), CHANNEL, midi("instrument")];
const NOTE_FIELDS: &[FieldSpec] = &[CHANNEL, midi("pitch"), midi("velocity")];
const LEGACY_NOTE_OFF_FIELDS: &[FieldSpec] =
    &[CHANNEL, midi("pitch"), midi("velocity").with_default(0)];
const CHANNEL_ONLY: &[FieldSpec] = &[CHANNEL];
const PITCH_BEND_FIELDS: &[FieldSpec] = &[CHANNEL, FieldSpec::signed_word("bend", -8192, 8191)];
const PITCH_BEND_RANGE_FIELDS: &[FieldSpec] = &[CHANNEL, midi("range")];
const MASTER_VOLUME_FIELDS: &[FieldSpec] = &[midi("level")];
const CHANNEL_VOLUME_FIELDS: &[FieldSpec] = &[CHANNEL, midi("level")];
const EXPRESSION_FIELDS: &[FieldSpec] = &[CHANNEL, midi("expression")];
const REVERB_FIELDS: &[FieldSpec] = &[
    CHANNEL,
    FieldSpec::byte("program", 0, 7),
    midi("level"),
    midi("feedback"),
];
const CHORUS_FIELDS: &[FieldSpec] = &[
    CHANNEL,
    FieldSpec::byte("program", 0, 7),
    midi("level"),
    midi("feedback"),
    midi("delay"),
];
const PAN_FIELDS: &[FieldSpec] = &[CHANNEL, midi("value")];
const EQUALIZER_FIELDS: &[FieldSpec] = &[
    CHANNEL,
    midi("low_band_gain"),
    midi("mid_low_band_gain"),
    midi("mid_high_band_gain"),
    midi("high_band_gain"),
    midi("low_band_freq"),
    midi("mid_low_band_freq"),
    midi("mid_high_band_freq"),
    midi("high_band_freq"),
];
const TUNING_FIELDS: &[FieldSpec] = &[CHANNEL, midi("fine"), midi("coarse")];
const VIBRATO_FIELDS: &[FieldSpec] = &[CHANNEL, midi("rate"), midi("depth"), midi("delay")];
const FILTER_FIELDS: &[FieldSpec] = &[CHANNEL, midi("cutoff"), midi("resonance")];
const ENVELOPE_FIELDS: &[FieldSpec] = &[CHANNEL, midi("attack"), midi("decay"), midi("release")];
const MOD_WHEEL_FIELDS: &[FieldSpec] = &[
    CHANNEL,
    midi("pitch"),
    midi("tvf_cutoff"),
    midi("amplitude"),
    midi("rate"),
    midi("pitch_depth"),
    midi("tvf_depth"),
    midi("tva_depth"),
];
const NO_FIELDS: &[FieldSpec] = &[];

const fn row(operation: Operation, id: u8, fields: &'static [FieldSpec]) -> CommandSpec {
    CommandSpec {
        operation,
        id,
        fields,
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Canonical command table.
pub const CANONICAL_TABLE: &[CommandSpec] = &[
    row(Operation::Begin, CMD_BEGIN, BEGIN_FIELDS),
    row(Operation::SetInstrument, CMD_SET_INSTRUMENT, INSTRUMENT_FIELDS),
    row(Operation::SetNoteOn, CMD_SET_NOTE_ON, NOTE_FIELDS),
    row(Operation::SetNoteOff, CMD_SET_NOTE_OFF, NOTE_FIELDS),
    row(Operation::SetAllNotesOff, CMD_SET_ALL_NOTES_OFF, CHANNEL_ONLY),
    row(Operation::SetPitchBend, CMD_SET_PITCH_BEND, PITCH_BEND_FIELDS),
    row(Operation::SetPitchBendRange, CMD_SET_PITCH_BEND_RANGE, PITCH_BEND_RANGE_FIELDS),
    row(Operation::SetMasterVolume, CMD_SET_MASTER_VOLUME, MASTER_VOLUME_FIELDS),
    row(Operation::SetChannelVolume, CMD_SET_CHANNEL_VOLUME, CHANNEL_VOLUME_FIELDS),
    row(Operation::SetExpression, CMD_SET_EXPRESSION, EXPRESSION_FIELDS),
    row(Operation::SetReverb, CMD_SET_REVERB, REVERB_FIELDS),
    row(Operation::SetChorus, CMD_SET_CHORUS, CHORUS_FIELDS),
    row(Operation::SetPan, CMD_SET_PAN, PAN_FIELDS),
    row(Operation::SetEqualizer, CMD_SET_EQUALIZER, EQUALIZER_FIELDS),
    row(Operation::SetTuning, CMD_SET_TUNING, TUNING_FIELDS),
    row(Operation::SetVibrato, CMD_SET_VIBRATO, VIBRATO_FIELDS),
    row(Operation::SetFilter, CMD_SET_FILTER, FILTER_FIELDS),
    row(Operation::SetEnvelope, CMD_SET_ENVELOPE, ENVELOPE_FIELDS),
    row(Operation::SetModWheel, CMD_SET_MOD_WHEEL, MOD_WHEEL_FIELDS),
    row(Operation::SetAllDrums, CMD_SET_ALL_DRUMS, NO_FIELDS),
    row(Operation::Reset, CMD_RESET, NO_FIELDS),
];

/// Legacy command table (older firmware revision).
pub const LEGACY_TABLE: &[CommandSpec] = &[
    row(Operation::Begin, LEGACY_CMD_INIT, BEGIN_FIELDS),
    row(Operation::SetInstrument, LEGACY_CMD_SET_INSTRUMENT, INSTRUMENT_FIELDS),
    row(Operation::SetMasterVolume, LEGACY_CMD_SET_MASTER_VOLUME, MASTER_VOLUME_FIELDS),
    row(Operation::SetNoteOn, LEGACY_CMD_SET_NOTE_ON, NOTE_FIELDS),
    row(Operation::SetNoteOff, LEGACY_CMD_SET_NOTE_OFF, LEGACY_NOTE_OFF_FIELDS),
    row(Operation::SetAllNotesOff, LEGACY_CMD_SET_ALL_NOTE_OFF, CHANNEL_ONLY),
    row(Operation::SetChannelVolume, LEGACY_CMD_SET_CHANNEL_VOLUME, CHANNEL_VOLUME_FIELDS),
    row(Operation::SetPitchBend, LEGACY_CMD_SET_PITCH_BEND, PITCH_BEND_FIELDS),
    row(Operation::SetPan, LEGACY_CMD_SET_PAN, PAN_FIELDS),
    row(Operation::SetReverb, LEGACY_CMD_SET_REVERB, REVERB_FIELDS),
    row(Operation::SetChorus, LEGACY_CMD_SET_CHORUS, CHORUS_FIELDS),
    row(Operation::Reset, LEGACY_CMD_SYSTEM_RESET, NO_FIELDS),
];

impl Profile {
    /// The command table for this profile.
    pub fn table(&self) -> &'static [CommandSpec] {
        match self {
            Profile::Canonical => CANONICAL_TABLE,
            Profile::Legacy => LEGACY_TABLE,
        }
    }

    /// Find the row for an operation.
    pub fn spec(&self, operation: Operation) -> Option<&'static CommandSpec> {
        self.table().iter().find(|s| s.operation == operation)
    }

    /// Find the row for a wire identifier.
    pub fn lookup(&self, id: u8) -> Option<&'static CommandSpec> {
        self.table().iter().find(|s| s.id == id)
    }

    /// Whether the profile carries the operation at all.
    pub fn supports(&self, operation: Operation) -> bool {
        self.spec(operation).is_some()
    }
}

/// Validate and pack raw field values for `operation` under `profile`.
pub fn encode_fields(
    profile: Profile,
    operation: Operation,
    values: &[i32],
) -> Result<Request, ProtocolError> {
    let spec = profile
        .spec(operation)
        .ok_or(ProtocolError::Unsupported { operation, profile })?;
    spec.encode(values)
}
