//! In-memory model of the SAM2695 synthesizer.
//!
//! [`VirtualSynth`] implements [`SynthDriver`] by tracking the parameters a
//! real chip would hold. It backs the simulated devices served by the runner
//! and lets tests assert on audible state instead of raw call logs.

use std::collections::BTreeMap;

use m5synth_protocol::{Equalizer, ModWheel, MIDI_CHANNELS};
use serde::Serialize;

use crate::driver::SynthDriver;

const DEFAULT_VOLUME: u8 = 100;
const DEFAULT_EXPRESSION: u8 = 127;
const DEFAULT_PAN: u8 = 64;
const DEFAULT_BEND_RANGE: u8 = 2;
const DEFAULT_MASTER_VOLUME: u8 = 127;
const DRUM_CHANNEL: usize = 9;

// ============================================================================
// State
// ============================================================================

/// UART settings passed to `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UartLink {
    pub rx_pin: u8,
    pub tx_pin: u8,
    pub baud: u16,
}

/// Reverb send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reverb {
    pub program: u8,
    pub level: u8,
    pub feedback: u8,
}

/// Chorus send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chorus {
    pub program: u8,
    pub level: u8,
    pub feedback: u8,
    pub delay: u8,
}

/// Vibrato settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Vibrato {
    pub rate: u8,
    pub depth: u8,
    pub delay: u8,
}

/// TVF settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub cutoff: u8,
    pub resonance: u8,
}

/// Amplitude envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub attack: u8,
    pub decay: u8,
    pub release: u8,
}

/// Parameters of one MIDI channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelState {
    pub bank: u8,
    pub instrument: u8,
    pub volume: u8,
    pub expression: u8,
    pub pan: u8,
    pub pitch_bend: i16,
    pub pitch_bend_range: u8,
    pub fine_tune: u8,
    pub coarse_tune: u8,
    pub reverb: Option<Reverb>,
    pub chorus: Option<Chorus>,
    pub equalizer: Option<Equalizer>,
    pub vibrato: Option<Vibrato>,
    pub filter: Option<Filter>,
    pub envelope: Option<Envelope>,
    pub mod_wheel: Option<ModWheel>,
    /// Sounding notes, pitch to velocity.
    pub notes: BTreeMap<u8, u8>,
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState {
            bank: 0,
            instrument: 0,
            volume: DEFAULT_VOLUME,
            expression: DEFAULT_EXPRESSION,
            pan: DEFAULT_PAN,
            pitch_bend: 0,
            pitch_bend_range: DEFAULT_BEND_RANGE,
            fine_tune: 64,
            coarse_tune: 64,
            reverb: None,
            chorus: None,
            equalizer: None,
            vibrato: None,
            filter: None,
            envelope: None,
            mod_wheel: None,
            notes: BTreeMap::new(),
        }
    }
}

/// Whole-chip state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthState {
    pub link: Option<UartLink>,
    pub master_volume: u8,
    pub all_drums: bool,
    pub channels: Vec<ChannelState>,
}

impl Default for SynthState {
    fn default() -> Self {
        SynthState {
            link: None,
            master_volume: DEFAULT_MASTER_VOLUME,
            all_drums: false,
            channels: vec![ChannelState::default(); MIDI_CHANNELS as usize],
        }
    }
}

// ============================================================================
// Virtual synthesizer
// ============================================================================

/// Driver that models chip state in memory.
///
/// Channel numbers are masked to the low nibble, as the chip does when the
/// channel is folded into a MIDI status byte.
#[derive(Debug, Clone, Default)]
pub struct VirtualSynth {
    state: SynthState,
}

impl VirtualSynth {
    /// Create a synth in its power-on state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &SynthState {
        &self.state
    }

    /// State of one channel.
    pub fn channel(&self, channel: u8) -> &ChannelState {
        &self.state.channels[Self::index(channel)]
    }

    /// Total number of sounding notes across all channels.
    pub fn sounding_notes(&self) -> usize {
        self.state.channels.iter().map(|c| c.notes.len()).sum()
    }

    fn index(channel: u8) -> usize {
        (channel & 0x0F) as usize
    }

    fn channel_mut(&mut self, channel: u8) -> &mut ChannelState {
        &mut self.state.channels[Self::index(channel)]
    }
}

impl SynthDriver for VirtualSynth {
    fn begin(&mut self, rx_pin: u8, tx_pin: u8, baud: u16) {
        self.state.link = Some(UartLink { rx_pin, tx_pin, baud });
    }

    fn set_instrument(&mut self, bank: u8, channel: u8, instrument: u8) {
        let ch = self.channel_mut(channel);
        ch.bank = bank;
        ch.instrument = instrument;
    }

    fn set_note_on(&mut self, channel: u8, pitch: u8, velocity: u8) {
        let notes = &mut self.channel_mut(channel).notes;
        // MIDI running-status convention: velocity 0 releases the note
        if velocity == 0 {
            notes.remove(&pitch);
        } else {
            notes.insert(pitch, velocity);
        }
    }

    fn set_note_off(&mut self, channel: u8, pitch: u8, _velocity: u8) {
        self.channel_mut(channel).notes.remove(&pitch);
    }

    fn set_all_notes_off(&mut self, channel: u8) {
        self.channel_mut(channel).notes.clear();
    }

    fn set_pitch_bend(&mut self, channel: u8, value: i16) {
        self.channel_mut(channel).pitch_bend = value;
    }

    fn set_pitch_bend_range(&mut self, channel: u8, range: u8) {
        self.channel_mut(channel).pitch_bend_range = range;
    }

    fn set_master_volume(&mut self, level: u8) {
        self.state.master_volume = level;
    }

    fn set_volume(&mut self, channel: u8, level: u8) {
        self.channel_mut(channel).volume = level;
    }

    fn set_expression(&mut self, channel: u8, expression: u8) {
        self.channel_mut(channel).expression = expression;
    }

    fn set_reverb(&mut self, channel: u8, program: u8, level: u8, feedback: u8) {
        self.channel_mut(channel).reverb = Some(Reverb { program, level, feedback });
    }

    fn set_chorus(&mut self, channel: u8, program: u8, level: u8, feedback: u8, delay: u8) {
        self.channel_mut(channel).chorus = Some(Chorus {
            program,
            level,
            feedback,
            delay,
        });
    }

    fn set_pan(&mut self, channel: u8, value: u8) {
        self.channel_mut(channel).pan = value;
    }

    fn set_equalizer(&mut self, channel: u8, bands: &Equalizer) {
        self.channel_mut(channel).equalizer = Some(*bands);
    }

    fn set_tuning(&mut self, channel: u8, fine: u8, coarse: u8) {
        let ch = self.channel_mut(channel);
        ch.fine_tune = fine;
        ch.coarse_tune = coarse;
    }

    fn set_vibrato(&mut self, channel: u8, rate: u8, depth: u8, delay: u8) {
        self.channel_mut(channel).vibrato = Some(Vibrato { rate, depth, delay });
    }

    fn set_tvf(&mut self, channel: u8, cutoff: u8, resonance: u8) {
        self.channel_mut(channel).filter = Some(Filter { cutoff, resonance });
    }

    fn set_envelope(&mut self, channel: u8, attack: u8, decay: u8, release: u8) {
        self.channel_mut(channel).envelope = Some(Envelope {
            attack,
            decay,
            release,
        });
    }

    fn set_mod_wheel(&mut self, channel: u8, wheel: &ModWheel) {
        self.channel_mut(channel).mod_wheel = Some(*wheel);
    }

    fn set_all_drums(&mut self) {
        self.state.all_drums = true;
        let drum_bank = self.state.channels[DRUM_CHANNEL].bank;
        let drum_kit = self.state.channels[DRUM_CHANNEL].instrument;
        for ch in &mut self.state.channels {
            ch.bank = drum_bank;
            ch.instrument = drum_kit;
        }
    }

    fn reset(&mut self) {
        let link = self.state.link;
        self.state = SynthState {
            link,
            ..SynthState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_defaults() {
        let synth = VirtualSynth::new();
        let state = synth.state();
        assert_eq!(state.link, None);
        assert_eq!(state.master_volume, 127);
        assert_eq!(state.channels.len(), 16);
        let ch = synth.channel(0);
        assert_eq!((ch.volume, ch.expression, ch.pan), (100, 127, 64));
        assert_eq!((ch.pitch_bend, ch.pitch_bend_range), (0, 2));
        assert!(ch.reverb.is_none());
    }

    #[test]
    fn test_note_tracking() {
        let mut synth = VirtualSynth::new();
        synth.set_note_on(0, 60, 100);
        synth.set_note_on(0, 64, 90);
        synth.set_note_on(3, 67, 80);
        assert_eq!(synth.sounding_notes(), 3);

        synth.set_note_off(0, 60, 0);
        synth.set_note_on(3, 67, 0);
        assert_eq!(synth.sounding_notes(), 1);
        assert_eq!(synth.channel(0).notes.get(&64), Some(&90));

        synth.set_all_notes_off(0);
        assert_eq!(synth.sounding_notes(), 0);
    }

    #[test]
    fn test_reset_keeps_link() {
        let mut synth = VirtualSynth::new();
        synth.begin(13, 14, 31250);
        synth.set_pan(2, 0);
        synth.set_reverb(2, 4, 100, 50);
        synth.set_note_on(2, 60, 100);

        synth.reset();

        assert_eq!(
            synth.state().link,
            Some(UartLink { rx_pin: 13, tx_pin: 14, baud: 31250 })
        );
        assert_eq!(synth.channel(2), &ChannelState::default());
    }

    #[test]
    fn test_channel_masked_to_nibble() {
        let mut synth = VirtualSynth::new();
        synth.set_volume(0x12, 5);
        assert_eq!(synth.channel(2).volume, 5);
    }

    #[test]
    fn test_all_drums() {
        let mut synth = VirtualSynth::new();
        synth.set_instrument(127, 9, 0);
        synth.set_instrument(0, 1, 40);
        synth.set_all_drums();
        assert!(synth.state().all_drums);
        assert!(synth
            .state()
            .channels
            .iter()
            .all(|c| c.bank == 127 && c.instrument == 0));
    }
}
