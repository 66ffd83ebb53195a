//! Synthesizer driver interface.
//!
//! [`SynthDriver`] mirrors the vendor M5UnitSynth library the firmware links
//! against. Calls are fire-and-forget register writes to the SAM2695: the
//! vendor library reports no failures, so neither does this trait.

use m5synth_protocol::{Command, Equalizer, ModWheel};

/// Operations of the vendor synthesizer driver.
pub trait SynthDriver {
    /// Open the UART link to the chip.
    fn begin(&mut self, rx_pin: u8, tx_pin: u8, baud: u16);
    /// Select bank and program for a channel.
    fn set_instrument(&mut self, bank: u8, channel: u8, instrument: u8);
    /// Note on.
    fn set_note_on(&mut self, channel: u8, pitch: u8, velocity: u8);
    /// Note off.
    fn set_note_off(&mut self, channel: u8, pitch: u8, velocity: u8);
    /// All notes off on one channel.
    fn set_all_notes_off(&mut self, channel: u8);
    /// Pitch bend, centred on zero.
    fn set_pitch_bend(&mut self, channel: u8, value: i16);
    /// Pitch bend range in semitones.
    fn set_pitch_bend_range(&mut self, channel: u8, range: u8);
    /// Master volume.
    fn set_master_volume(&mut self, level: u8);
    /// Channel volume.
    fn set_volume(&mut self, channel: u8, level: u8);
    /// Channel expression.
    fn set_expression(&mut self, channel: u8, expression: u8);
    /// Reverb type, level and delay feedback.
    fn set_reverb(&mut self, channel: u8, program: u8, level: u8, feedback: u8);
    /// Chorus type, level, feedback and delay.
    fn set_chorus(&mut self, channel: u8, program: u8, level: u8, feedback: u8, delay: u8);
    /// Stereo pan.
    fn set_pan(&mut self, channel: u8, value: u8);
    /// Four-band equalizer.
    fn set_equalizer(&mut self, channel: u8, bands: &Equalizer);
    /// Fine and coarse tuning.
    fn set_tuning(&mut self, channel: u8, fine: u8, coarse: u8);
    /// Vibrato rate, depth and delay.
    fn set_vibrato(&mut self, channel: u8, rate: u8, depth: u8, delay: u8);
    /// TVF cutoff and resonance.
    fn set_tvf(&mut self, channel: u8, cutoff: u8, resonance: u8);
    /// Amplitude envelope.
    fn set_envelope(&mut self, channel: u8, attack: u8, decay: u8, release: u8);
    /// Modulation wheel routing.
    fn set_mod_wheel(&mut self, channel: u8, wheel: &ModWheel);
    /// Switch every channel to drums.
    fn set_all_drums(&mut self);
    /// Restore default synthesizer parameters.
    fn reset(&mut self);
}

/// Invoke the driver operation matching a decoded command.
pub fn apply<D: SynthDriver + ?Sized>(driver: &mut D, command: &Command) {
    match *command {
        Command::Begin { rx_pin, tx_pin, baud } => driver.begin(rx_pin, tx_pin, baud),
        Command::SetInstrument { bank, channel, instrument } => {
            driver.set_instrument(bank, channel, instrument)
        }
        Command::SetNoteOn { channel, pitch, velocity } => driver.set_note_on(channel, pitch, velocity),
        Command::SetNoteOff { channel, pitch, velocity } => {
            driver.set_note_off(channel, pitch, velocity)
        }
        Command::SetAllNotesOff { channel } => driver.set_all_notes_off(channel),
        Command::SetPitchBend { channel, bend } => driver.set_pitch_bend(channel, bend),
        Command::SetPitchBendRange { channel, range } => driver.set_pitch_bend_range(channel, range),
        Command::SetMasterVolume { level } => driver.set_master_volume(level),
        Command::SetChannelVolume { channel, level } => driver.set_volume(channel, level),
        Command::SetExpression { channel, expression } => driver.set_expression(channel, expression),
        Command::SetReverb { channel, program, level, feedback } => {
            driver.set_reverb(channel, program, level, feedback)
        }
        Command::SetChorus { channel, program, level, feedback, delay } => {
            driver.set_chorus(channel, program, level, feedback, delay)
        }
        Command::SetPan { channel, value } => driver.set_pan(channel, value),
        Command::SetEqualizer { channel, ref bands } => driver.set_equalizer(channel, bands),
        Command::SetTuning { channel, fine, coarse } => driver.set_tuning(channel, fine, coarse),
        Command::SetVibrato { channel, rate, depth, delay } => {
            driver.set_vibrato(channel, rate, depth, delay)
        }
        Command::SetFilter { channel, cutoff, resonance } => driver.set_tvf(channel, cutoff, resonance),
        Command::SetEnvelope { channel, attack, decay, release } => {
            driver.set_envelope(channel, attack, decay, release)
        }
        Command::SetModWheel { channel, ref wheel } => driver.set_mod_wheel(channel, wheel),
        Command::SetAllDrums => driver.set_all_drums(),
        Command::Reset => driver.reset(),
    }
}

/// Driver stub that records every call as the equivalent [`Command`].
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    calls: Vec<Command>,
}

impl RecordingDriver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> &[Command] {
        &self.calls
    }

    /// Forget recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl SynthDriver for RecordingDriver {
    fn begin(&mut self, rx_pin: u8, tx_pin: u8, baud: u16) {
        self.calls.push(Command::Begin { rx_pin, tx_pin, baud });
    }

    fn set_instrument(&mut self, bank: u8, channel: u8, instrument: u8) {
        self.calls.push(Command::SetInstrument { bank, channel, instrument });
    }

    fn set_note_on(&mut self, channel: u8, pitch: u8, velocity: u8) {
        self.calls.push(Command::SetNoteOn { channel, pitch, velocity });
    }

    fn set_note_off(&mut self, channel: u8, pitch: u8, velocity: u8) {
        self.calls.push(Command::SetNoteOff { channel, pitch, velocity });
    }

    fn set_all_notes_off(&mut self, channel: u8) {
        self.calls.push(Command::SetAllNotesOff { channel });
    }

    fn set_pitch_bend(&mut self, channel: u8, value: i16) {
        self.calls.push(Command::SetPitchBend { channel, bend: value });
    }

    fn set_pitch_bend_range(&mut self, channel: u8, range: u8) {
        self.calls.push(Command::SetPitchBendRange { channel, range });
    }

    fn set_master_volume(&mut self, level: u8) {
        self.calls.push(Command::SetMasterVolume { level });
    }

    fn set_volume(&mut self, channel: u8, level: u8) {
        self.calls.push(Command::SetChannelVolume { channel, level });
    }

    fn set_expression(&mut self, channel: u8, expression: u8) {
        self.calls.push(Command::SetExpression { channel, expression });
    }

    fn set_reverb(&mut self, channel: u8, program: u8, level: u8, feedback: u8) {
        self.calls.push(Command::SetReverb { channel, program, level, feedback });
    }

    fn set_chorus(&mut self, channel: u8, program: u8, level: u8, feedback: u8, delay: u8) {
        self.calls.push(Command::SetChorus { channel, program, level, feedback, delay });
    }

    fn set_pan(&mut self, channel: u8, value: u8) {
        self.calls.push(Command::SetPan { channel, value });
    }

    fn set_equalizer(&mut self, channel: u8, bands: &Equalizer) {
        self.calls.push(Command::SetEqualizer { channel, bands: *bands });
    }

    fn set_tuning(&mut self, channel: u8, fine: u8, coarse: u8) {
        self.calls.push(Command::SetTuning { channel, fine, coarse });
    }

    fn set_vibrato(&mut self, channel: u8, rate: u8, depth: u8, delay: u8) {
        self.calls.push(Command::SetVibrato { channel, rate, depth, delay });
    }

    fn set_tvf(&mut self, channel: u8, cutoff: u8, resonance: u8) {
        self.calls.push(Command::SetFilter { channel, cutoff, resonance });
    }

    fn set_envelope(&mut self, channel: u8, attack: u8, decay: u8, release: u8) {
        self.calls.push(Command::SetEnvelope { channel, attack, decay, release });
    }

    fn set_mod_wheel(&mut self, channel: u8, wheel: &ModWheel) {
        self.calls.push(Command::SetModWheel { channel, wheel: *wheel });
    }

    fn set_all_drums(&mut self) {
        self.calls.push(Command::SetAllDrums);
    }

    fn reset(&mut self) {
        self.calls.push(Command::Reset);
    }
}
