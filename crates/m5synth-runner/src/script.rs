//! YAML command scripts.
//!
//! ```yaml
//! profile: canonical
//! begin: { rx_pin: 13, tx_pin: 14, baud: 31250 }
//! steps:
//!   - { op: set_instrument, args: [0, 0, 24] }
//!   - { play_note: { channel: 0, pitch: 60, velocity: 100, duration_ms: 500 } }
//!   - { sleep_ms: 250 }
//! ```
//!
//! A script is compiled before playback: every step is resolved and
//! validated against the profile's table, so a bad step anywhere rejects the
//! whole script before anything is sent.

use std::path::Path;
use std::time::Duration;

use m5synth_protocol::{
    encode_fields, Operation, Profile, ProtocolError, DEFAULT_BAUD, DEFAULT_RX_PIN, DEFAULT_TX_PIN,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunnerError};

/// Script file contents.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Command table to use.
    #[serde(default)]
    pub profile: Profile,
    /// Sent before the first step when present.
    #[serde(default)]
    pub begin: Option<BeginConfig>,
    /// Steps in playback order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// UART settings for `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BeginConfig {
    #[serde(default = "default_rx_pin")]
    pub rx_pin: u8,
    #[serde(default = "default_tx_pin")]
    pub tx_pin: u8,
    #[serde(default = "default_baud")]
    pub baud: u16,
}

fn default_rx_pin() -> u8 {
    DEFAULT_RX_PIN
}

fn default_tx_pin() -> u8 {
    DEFAULT_TX_PIN
}

fn default_baud() -> u16 {
    DEFAULT_BAUD
}

impl Default for BeginConfig {
    fn default() -> Self {
        BeginConfig {
            rx_pin: DEFAULT_RX_PIN,
            tx_pin: DEFAULT_TX_PIN,
            baud: DEFAULT_BAUD,
        }
    }
}

/// One script step as written.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Step {
    /// Raw operation with table-ordered arguments.
    Command {
        op: String,
        #[serde(default)]
        args: Vec<i32>,
    },
    /// Note on, hold, note off.
    PlayNote { play_note: NoteSpec },
    /// Pause.
    Sleep { sleep_ms: u64 },
}

/// A timed note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct NoteSpec {
    pub channel: i32,
    pub pitch: i32,
    pub velocity: i32,
    pub duration_ms: u64,
}

/// A validated step, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send {
        operation: Operation,
        values: Vec<i32>,
    },
    PlayNote {
        channel: u8,
        pitch: u8,
        velocity: u8,
        duration: Duration,
    },
    Sleep(Duration),
}

/// A script whose steps all passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub profile: Profile,
    pub begin: Option<BeginConfig>,
    pub actions: Vec<Action>,
}

impl Script {
    /// Parse YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a script file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Resolve and validate every step against `self.profile`.
    ///
    /// Step numbers in errors are 1-based.
    pub fn compile(&self) -> Result<CompiledScript> {
        let profile = self.profile;
        let mut actions = Vec::with_capacity(self.steps.len());

        for (i, step) in self.steps.iter().enumerate() {
            let fail = |source: ProtocolError| RunnerError::Script { step: i + 1, source };
            let action = match step {
                Step::Command { op, args } => {
                    let operation = op.parse::<Operation>().map_err(fail)?;
                    encode_fields(profile, operation, args).map_err(fail)?;
                    Action::Send {
                        operation,
                        values: args.clone(),
                    }
                }
                Step::PlayNote { play_note: note } => {
                    encode_fields(
                        profile,
                        Operation::SetNoteOn,
                        &[note.channel, note.pitch, note.velocity],
                    )
                    .map_err(fail)?;
                    Action::PlayNote {
                        channel: note.channel as u8,
                        pitch: note.pitch as u8,
                        velocity: note.velocity as u8,
                        duration: Duration::from_millis(note.duration_ms),
                    }
                }
                Step::Sleep { sleep_ms } => Action::Sleep(Duration::from_millis(*sleep_ms)),
            };
            actions.push(action);
        }

        Ok(CompiledScript {
            profile,
            begin: self.begin,
            actions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
profile: canonical
begin: { rx_pin: 13, tx_pin: 14, baud: 31250 }
steps:
  - { op: set_instrument, args: [0, 0, 24] }
  - { play_note: { channel: 0, pitch: 60, velocity: 100, duration_ms: 500 } }
  - { sleep_ms: 250 }
  - { op: reset }
"#;

    #[test]
    fn test_parse_sample() {
        let script = Script::from_yaml(SAMPLE).unwrap();
        assert_eq!(script.profile, Profile::Canonical);
        assert_eq!(script.begin, Some(BeginConfig::default()));
        assert_eq!(script.steps.len(), 4);

        let compiled = script.compile().unwrap();
        assert_eq!(
            compiled.actions,
            vec![
                Action::Send { operation: Operation::SetInstrument, values: vec![0, 0, 24] },
                Action::PlayNote {
                    channel: 0,
                    pitch: 60,
                    velocity: 100,
                    duration: Duration::from_millis(500),
                },
                Action::Sleep(Duration::from_millis(250)),
                Action::Send { operation: Operation::Reset, values: vec![] },
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let script = Script::from_yaml("steps: []\n").unwrap();
        assert_eq!(script.profile, Profile::Canonical);
        assert!(script.begin.is_none());

        let script = Script::from_yaml("profile: legacy\nbegin: { baud: 9600 }\n").unwrap();
        assert_eq!(script.profile, Profile::Legacy);
        assert_eq!(
            script.begin,
            Some(BeginConfig { rx_pin: 13, tx_pin: 14, baud: 9600 })
        );
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let script = Script::from_yaml("steps:\n  - { sleep_ms: 1 }\n  - { op: set_tempo, args: [120] }\n")
            .unwrap();
        match script.compile() {
            Err(RunnerError::Script { step: 2, source: ProtocolError::UnknownOperation(name) }) => {
                assert_eq!(name, "set_tempo");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let script = Script::from_yaml("steps:\n  - { op: set_pan, args: [0] }\n").unwrap();
        assert!(matches!(
            script.compile(),
            Err(RunnerError::Script { step: 1, source: ProtocolError::Arity { expected: 2, actual: 1, .. } })
        ));
    }

    #[test]
    fn test_out_of_range_note_rejected() {
        let script = Script::from_yaml(
            "steps:\n  - { play_note: { channel: 0, pitch: 128, velocity: 1, duration_ms: 1 } }\n",
        )
        .unwrap();
        assert!(matches!(
            script.compile(),
            Err(RunnerError::Script { step: 1, source: ProtocolError::Validation { field: "pitch", .. } })
        ));
    }

    #[test]
    fn test_legacy_unsupported_rejected() {
        let script = Script::from_yaml("profile: legacy\nsteps:\n  - { op: set_vibrato, args: [0, 1, 2, 3] }\n")
            .unwrap();
        assert!(matches!(
            script.compile(),
            Err(RunnerError::Script { step: 1, source: ProtocolError::Unsupported { .. } })
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Script::from_yaml("tempo: 120\nsteps: []\n").is_err());
    }
}
