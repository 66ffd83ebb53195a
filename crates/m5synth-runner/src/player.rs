//! Script playback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use m5synth_host::{SynthClient, Transport};
use tracing::{debug, info, warn};

use crate::error::{Result, RunnerError};
use crate::script::{Action, CompiledScript};

/// Granularity of interruptible sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Summary of one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayReport {
    /// Steps that ran to completion.
    pub steps: usize,
    /// Whether the device accepted `begin`. `None` when the script has none.
    pub begun: Option<bool>,
    pub elapsed: Duration,
}

/// Plays compiled scripts and stops cleanly on request.
///
/// A stop request is honoured between steps and during sleeps. Before
/// returning [`RunnerError::Interrupted`] the player sends all-notes-off on
/// every channel, best effort.
#[derive(Debug, Clone, Default)]
pub struct ScriptPlayer {
    stop: Arc<AtomicBool>,
}

impl ScriptPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that stops playback when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Route Ctrl-C to the stop flag. Can only be installed once per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let stop = self.stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })?;
        Ok(())
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Wait for `duration` unless stopped first. Returns false if stopped.
    fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    fn interrupted<T: Transport>(&self, client: &mut SynthClient<T>) -> RunnerError {
        warn!("playback interrupted, silencing all channels");
        if let Err(e) = client.silence() {
            warn!(error = %e, "cleanup incomplete");
        }
        RunnerError::Interrupted
    }

    /// Run every action in order. The first failing step aborts playback.
    pub fn play<T: Transport>(
        &self,
        client: &mut SynthClient<T>,
        script: &CompiledScript,
    ) -> Result<PlayReport> {
        let start = Instant::now();
        let mut report = PlayReport::default();

        if let Some(begin) = script.begin {
            report.begun = Some(client.begin(begin.rx_pin, begin.tx_pin, begin.baud)?);
        }

        for (i, action) in script.actions.iter().enumerate() {
            if self.stopped() {
                return Err(self.interrupted(client));
            }
            debug!(step = i + 1, ?action, "step");
            match action {
                Action::Send { operation, values } => client.call(*operation, values)?,
                Action::PlayNote {
                    channel,
                    pitch,
                    velocity,
                    duration,
                } => client.play_note(*channel, *pitch, *velocity, *duration)?,
                Action::Sleep(duration) => {
                    if !self.sleep(*duration) {
                        return Err(self.interrupted(client));
                    }
                }
            }
            report.steps += 1;
        }

        report.elapsed = start.elapsed();
        info!(steps = report.steps, elapsed = ?report.elapsed, "script finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Script;
    use m5synth_firmware::{Dispatcher, FirmwareDevice, RecordingDriver};
    use m5synth_host::LoopbackTransport;
    use m5synth_protocol::{Command, Profile};

    fn client() -> SynthClient<LoopbackTransport<RecordingDriver>> {
        let device = FirmwareDevice::new(Dispatcher::new(Profile::Canonical));
        SynthClient::new(LoopbackTransport::new(device))
    }

    fn calls(client: &SynthClient<LoopbackTransport<RecordingDriver>>) -> Vec<Command> {
        client
            .transport()
            .device()
            .dispatcher()
            .driver()
            .map(|d| d.calls().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn test_play_in_order() {
        let script = Script::from_yaml(
            "begin: {}\nsteps:\n  - { op: set_master_volume, args: [90] }\n  - { play_note: { channel: 1, pitch: 60, velocity: 100, duration_ms: 1 } }\n",
        )
        .unwrap()
        .compile()
        .unwrap();

        let mut c = client();
        let report = ScriptPlayer::new().play(&mut c, &script).unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(report.begun, Some(true));
        assert_eq!(
            calls(&c),
            vec![
                Command::Begin { rx_pin: 13, tx_pin: 14, baud: 31250 },
                Command::SetMasterVolume { level: 90 },
                Command::SetNoteOn { channel: 1, pitch: 60, velocity: 100 },
                Command::SetNoteOff { channel: 1, pitch: 60, velocity: 0 },
            ]
        );
    }

    #[test]
    fn test_missing_begin_fails_first_step() {
        let script = Script::from_yaml("steps:\n  - { op: reset }\n  - { op: reset }\n")
            .unwrap()
            .compile()
            .unwrap();
        let mut c = client();
        assert!(matches!(
            ScriptPlayer::new().play(&mut c, &script),
            Err(RunnerError::Host(_))
        ));
        assert!(calls(&c).is_empty());
    }

    #[test]
    fn test_stop_silences_channels() {
        let script = Script::from_yaml("begin: {}\nsteps:\n  - { sleep_ms: 10000 }\n  - { op: reset }\n")
            .unwrap()
            .compile()
            .unwrap();
        let player = ScriptPlayer::new();
        player.stop_flag().store(true, Ordering::SeqCst);

        let mut c = client();
        let started = Instant::now();
        assert!(matches!(player.play(&mut c, &script), Err(RunnerError::Interrupted)));
        assert!(started.elapsed() < Duration::from_secs(5));

        let calls = calls(&c);
        assert_eq!(calls.len(), 17);
        assert!(calls[1..]
            .iter()
            .all(|cmd| matches!(cmd, Command::SetAllNotesOff { .. })));
    }
}
