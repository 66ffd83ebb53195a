//! Protocol constants
//!
//! Command identifiers for both table revisions, status codes, sizes and the
//! defaults the firmware applies to a short `begin` payload.

// ============================================================================
// Command Identifiers (canonical table)
// ============================================================================

/// Construct the driver and open the UART link to the synth chip.
pub const CMD_BEGIN: u8 = 0x01;
/// Select an instrument (program) for a channel.
pub const CMD_SET_INSTRUMENT: u8 = 0x02;
/// Start a note.
pub const CMD_SET_NOTE_ON: u8 = 0x03;
/// Stop a note.
pub const CMD_SET_NOTE_OFF: u8 = 0x04;
/// Stop all notes on a channel.
pub const CMD_SET_ALL_NOTES_OFF: u8 = 0x05;
/// Set the 14-bit pitch bend of a channel.
pub const CMD_SET_PITCH_BEND: u8 = 0x06;
/// Set the pitch bend range (semitones) of a channel.
pub const CMD_SET_PITCH_BEND_RANGE: u8 = 0x07;
/// Set the master volume.
pub const CMD_SET_MASTER_VOLUME: u8 = 0x08;
/// Set the volume of a channel.
pub const CMD_SET_CHANNEL_VOLUME: u8 = 0x09;
/// Set the expression controller of a channel.
pub const CMD_SET_EXPRESSION: u8 = 0x0A;
/// Configure the reverb effect.
pub const CMD_SET_REVERB: u8 = 0x0B;
/// Configure the chorus effect.
pub const CMD_SET_CHORUS: u8 = 0x0C;
/// Set the stereo pan of a channel.
pub const CMD_SET_PAN: u8 = 0x0D;
/// Configure the four-band equalizer.
pub const CMD_SET_EQUALIZER: u8 = 0x0E;
/// Set fine and coarse tuning of a channel.
pub const CMD_SET_TUNING: u8 = 0x0F;
/// Configure vibrato.
pub const CMD_SET_VIBRATO: u8 = 0x10;
/// Configure the time-variant filter (TVF).
pub const CMD_SET_FILTER: u8 = 0x11;
/// Configure the amplitude envelope.
pub const CMD_SET_ENVELOPE: u8 = 0x12;
/// Configure modulation wheel routing.
pub const CMD_SET_MOD_WHEEL: u8 = 0x13;
/// Switch every channel to the drum kit.
pub const CMD_SET_ALL_DRUMS: u8 = 0x14;
/// Restore synthesizer parameters to their defaults.
pub const CMD_RESET: u8 = 0x15;

// ============================================================================
// Command Identifiers (legacy table)
// ============================================================================

/// Legacy: construct the driver and open the UART link.
pub const LEGACY_CMD_INIT: u8 = 0x01;
/// Legacy: select an instrument.
pub const LEGACY_CMD_SET_INSTRUMENT: u8 = 0x02;
/// Legacy: set the master volume.
pub const LEGACY_CMD_SET_MASTER_VOLUME: u8 = 0x03;
/// Legacy: start a note.
pub const LEGACY_CMD_SET_NOTE_ON: u8 = 0x04;
/// Legacy: stop a note (velocity optional).
pub const LEGACY_CMD_SET_NOTE_OFF: u8 = 0x05;
/// Legacy: stop all notes on a channel.
pub const LEGACY_CMD_SET_ALL_NOTE_OFF: u8 = 0x06;
/// Legacy: set the volume of a channel.
pub const LEGACY_CMD_SET_CHANNEL_VOLUME: u8 = 0x07;
/// Legacy: set pitch bend.
pub const LEGACY_CMD_SET_PITCH_BEND: u8 = 0x08;
/// Legacy: set the stereo pan of a channel.
pub const LEGACY_CMD_SET_PAN: u8 = 0x09;
/// Legacy: configure reverb.
pub const LEGACY_CMD_SET_REVERB: u8 = 0x0A;
/// Legacy: configure chorus.
pub const LEGACY_CMD_SET_CHORUS: u8 = 0x0B;
// NOTE: 0x0C..=0x0F (tempo, sustain, transpose, modulation) are reserved.
// The legacy firmware never handled them and answers them like unknown ids.
/// Legacy: reserved, never handled.
pub const LEGACY_CMD_SET_TEMPO: u8 = 0x0C;
/// Legacy: reserved, never handled.
pub const LEGACY_CMD_SET_SUSTAIN: u8 = 0x0D;
/// Legacy: reserved, never handled.
pub const LEGACY_CMD_SET_TRANSPOSE: u8 = 0x0E;
/// Legacy: reserved, never handled.
pub const LEGACY_CMD_SET_MODULATION: u8 = 0x0F;
/// Legacy: restore synthesizer parameters to their defaults.
pub const LEGACY_CMD_SYSTEM_RESET: u8 = 0x10;

// ============================================================================
// Status Codes
// ============================================================================

/// Status byte for a command that executed.
pub const STATUS_OK: u8 = 1;
/// Status byte for a command that was rejected (not ready, malformed, unknown).
pub const STATUS_FAILED: u8 = 0;

// ============================================================================
// Sizes
// ============================================================================

/// Maximum payload length of a request or response.
pub const MAX_PAYLOAD_SIZE: usize = 32;
/// Number of MIDI channels.
pub const MIDI_CHANNELS: u8 = 16;
/// Number of equalizer bands.
pub const EQ_BANDS: usize = 4;

// ============================================================================
// Begin Defaults
// ============================================================================

/// UART RX pin used when `begin` omits it (Port C on the ESP32 core).
pub const DEFAULT_RX_PIN: u8 = 13;
/// UART TX pin used when `begin` omits it.
pub const DEFAULT_TX_PIN: u8 = 14;
/// MIDI baud rate used when `begin` omits it.
pub const DEFAULT_BAUD: u16 = 31250;
