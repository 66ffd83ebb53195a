//! Command dispatcher.
//!
//! The dispatcher turns one received packet into one driver call and one
//! status byte. It holds the session state: until a `begin` has executed,
//! every other command is answered with status 0 and the driver is not
//! touched.

use std::fmt;

use m5synth_metrics::{metric_defs, DeviceLabels};
use m5synth_protocol::{Command, Operation, Profile, Response, Status};

use crate::driver::{apply, SynthDriver};

/// Whether `begin` has executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No driver yet; only `begin` is accepted.
    #[default]
    Uninitialized,
    /// Driver open; every supported command is accepted.
    Ready,
}

/// What happened to one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Driver operation invoked.
    Executed,
    /// Command arrived before `begin`.
    NotReady,
    /// Payload shorter than the command needs.
    Malformed,
    /// Identifier not in the active table.
    Unknown,
}

impl Outcome {
    /// Label value used in metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Outcome::Executed => "ok",
            Outcome::NotReady => "not_ready",
            Outcome::Malformed => "malformed",
            Outcome::Unknown => "unknown",
        }
    }

    /// Status byte reported to the host.
    pub fn status(&self) -> Status {
        Status::from(matches!(self, Outcome::Executed))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running counts of handled packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Commands that reached the driver.
    pub executed: u64,
    /// Commands received before `begin`.
    pub not_ready: u64,
    /// Payloads too short to decode.
    pub malformed: u64,
    /// Identifiers missing from the table.
    pub unknown: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Executed => self.executed += 1,
            Outcome::NotReady => self.not_ready += 1,
            Outcome::Malformed => self.malformed += 1,
            Outcome::Unknown => self.unknown += 1,
        }
    }

    /// Packets answered with status 0.
    pub fn failed(&self) -> u64 {
        self.not_ready + self.malformed + self.unknown
    }
}

/// Builds the driver on the first `begin`.
pub type DriverFactory<D> = Box<dyn FnMut() -> D + Send>;

/// Firmware command dispatcher.
///
/// The driver is created by the factory the first time `begin` executes and
/// reused afterwards: a repeated `begin` re-runs the driver's `begin` on the
/// same instance.
pub struct Dispatcher<D> {
    profile: Profile,
    labels: DeviceLabels,
    state: SessionState,
    driver: Option<D>,
    make_driver: DriverFactory<D>,
    stats: DispatchStats,
}

impl<D: SynthDriver + Default + 'static> Dispatcher<D> {
    /// Create a dispatcher whose driver is built with `D::default()`.
    pub fn new(profile: Profile) -> Self {
        Self::with_factory(profile, D::default)
    }
}

impl<D: SynthDriver> Dispatcher<D> {
    /// Create a dispatcher with a custom driver factory.
    pub fn with_factory(profile: Profile, factory: impl FnMut() -> D + Send + 'static) -> Self {
        Dispatcher {
            profile,
            labels: DeviceLabels::new("synth", profile.as_str()),
            state: SessionState::Uninitialized,
            driver: None,
            make_driver: Box::new(factory),
            stats: DispatchStats::default(),
        }
    }

    /// Set the device name used in logs and metric labels.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.labels.device = name.into();
        self
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.labels.device
    }

    /// Active command table.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Driver, once `begin` has executed.
    pub fn driver(&self) -> Option<&D> {
        self.driver.as_ref()
    }

    /// Mutable driver, once `begin` has executed.
    pub fn driver_mut(&mut self) -> Option<&mut D> {
        self.driver.as_mut()
    }

    /// Handled-packet counts.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Handle one received packet and build its response.
    ///
    /// The response always echoes `id` and carries exactly one status byte.
    pub fn handle(&mut self, id: u8, payload: &[u8]) -> Response {
        let (operation, outcome) = self.execute(id, payload);
        self.stats.record(outcome);

        let op_name = operation.map(|op| op.name()).unwrap_or("unknown");
        match outcome {
            Outcome::Executed => log::debug!(
                "[{}] 0x{:02X} {} ({} bytes) executed",
                self.labels.device,
                id,
                op_name,
                payload.len()
            ),
            _ => log::warn!(
                "[{}] 0x{:02X} {} ({} bytes) rejected: {}",
                self.labels.device,
                id,
                op_name,
                payload.len(),
                outcome
            ),
        }

        let labels = self.labels.command(op_name, outcome.as_str());
        metrics::counter!(metric_defs::DEVICE_COMMANDS.name, &labels).increment(1);

        Response::with_status(id, outcome.status())
    }

    fn execute(&mut self, id: u8, payload: &[u8]) -> (Option<Operation>, Outcome) {
        let Some(spec) = self.profile.lookup(id) else {
            return (None, Outcome::Unknown);
        };
        let operation = spec.operation;

        if self.state == SessionState::Uninitialized && operation != Operation::Begin {
            return (Some(operation), Outcome::NotReady);
        }

        let Some(values) = spec.decode(payload) else {
            return (Some(operation), Outcome::Malformed);
        };
        let command = match Command::from_values(operation, &values) {
            Ok(command) => command,
            Err(e) => {
                log::error!("[{}] table and command layout disagree: {}", self.labels.device, e);
                return (Some(operation), Outcome::Malformed);
            }
        };

        let make_driver = &mut self.make_driver;
        let driver = self.driver.get_or_insert_with(|| make_driver());
        apply(driver, &command);

        if operation == Operation::Begin && self.state == SessionState::Uninitialized {
            log::info!("[{}] synth ready", self.labels.device);
            self.state = SessionState::Ready;
        }

        (Some(operation), Outcome::Executed)
    }
}

impl<D: fmt::Debug> fmt::Debug for Dispatcher<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.labels.device)
            .field("profile", &self.profile)
            .field("state", &self.state)
            .field("driver", &self.driver)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use m5synth_protocol::*;

    fn dispatcher() -> Dispatcher<RecordingDriver> {
        Dispatcher::new(Profile::Canonical)
    }

    fn calls(d: &Dispatcher<RecordingDriver>) -> usize {
        d.driver().map(|drv| drv.calls().len()).unwrap_or(0)
    }

    #[test]
    fn test_commands_rejected_before_begin() {
        let mut d = dispatcher();
        let response = d.handle(CMD_SET_NOTE_ON, &[0, 60, 100]);
        assert_eq!(response.id(), CMD_SET_NOTE_ON);
        assert_eq!(response.payload(), &[STATUS_FAILED]);
        assert_eq!(d.state(), SessionState::Uninitialized);
        assert!(d.driver().is_none());

        let response = d.handle(CMD_BEGIN, &[13, 14, 0x12, 0x7A]);
        assert_eq!(response.payload(), &[STATUS_OK]);
        assert_eq!(d.state(), SessionState::Ready);

        let response = d.handle(CMD_SET_NOTE_ON, &[0, 60, 100]);
        assert_eq!(response.payload(), &[STATUS_OK]);
        assert_eq!(
            d.driver().unwrap().calls(),
            &[
                Command::Begin { rx_pin: 13, tx_pin: 14, baud: 31250 },
                Command::SetNoteOn { channel: 0, pitch: 60, velocity: 100 },
            ]
        );
    }

    #[test]
    fn test_begin_defaults_for_empty_payload() {
        let mut d = dispatcher();
        assert!(d.handle(CMD_BEGIN, &[]).status().is_ok());
        assert_eq!(
            d.driver().unwrap().calls(),
            &[Command::Begin { rx_pin: DEFAULT_RX_PIN, tx_pin: DEFAULT_TX_PIN, baud: DEFAULT_BAUD }]
        );

        // Partial payload keeps the fields it carries
        assert!(d.handle(CMD_BEGIN, &[4]).status().is_ok());
        assert_eq!(
            d.driver().unwrap().calls()[1],
            Command::Begin { rx_pin: 4, tx_pin: DEFAULT_TX_PIN, baud: DEFAULT_BAUD }
        );
    }

    #[test]
    fn test_short_payload_rejected_without_driver_call() {
        let mut d = dispatcher();
        d.handle(CMD_BEGIN, &[]);

        for spec in Profile::Canonical.table() {
            if spec.min_len() == 0 {
                continue;
            }
            let before = calls(&d);
            let payload = vec![0u8; spec.min_len() - 1];
            let response = d.handle(spec.id, &payload);
            assert_eq!(response.payload(), &[STATUS_FAILED], "{}", spec.operation);
            assert_eq!(calls(&d), before, "{} must not reach the driver", spec.operation);
        }
        assert_eq!(d.stats().malformed, 18);
    }

    #[test]
    fn test_unknown_identifier() {
        let mut d = dispatcher();
        d.handle(CMD_BEGIN, &[]);
        let response = d.handle(0xFF, &[1, 2, 3]);
        assert_eq!(response.id(), 0xFF);
        assert_eq!(response.payload(), &[STATUS_FAILED]);
        assert_eq!(calls(&d), 1);
        assert_eq!(d.stats().unknown, 1);
        assert_eq!(d.state(), SessionState::Ready);
    }

    #[test]
    fn test_every_command_rejected_while_uninitialized() {
        for profile in [Profile::Canonical, Profile::Legacy] {
            let mut d = Dispatcher::<RecordingDriver>::new(profile);
            let mut rejected = 0;
            for spec in profile.table() {
                if spec.operation == Operation::Begin {
                    continue;
                }
                let payload = vec![0u8; spec.min_len()];
                let response = d.handle(spec.id, &payload);
                assert_eq!(response.id(), spec.id);
                assert_eq!(response.payload(), &[STATUS_FAILED], "{profile:?} {}", spec.operation);
                rejected += 1;
            }
            assert_eq!(d.stats().not_ready, rejected);

            // Unknown identifiers fail the same way and leave the session alone
            assert_eq!(d.handle(0xFF, &[]).payload(), &[STATUS_FAILED]);
            assert_eq!(d.stats().unknown, 1);
            assert_eq!(d.state(), SessionState::Uninitialized);
            assert!(d.driver().is_none());
        }
    }

    #[test]
    fn test_extra_bytes_ignored() {
        let mut d = dispatcher();
        d.handle(CMD_BEGIN, &[]);
        assert!(d.handle(CMD_SET_PAN, &[1, 20, 0xAA, 0xBB]).status().is_ok());
        assert_eq!(
            d.driver().unwrap().calls()[1],
            Command::SetPan { channel: 1, value: 20 }
        );
    }

    #[test]
    fn test_reset_keeps_session_ready() {
        let mut d = dispatcher();
        d.handle(CMD_BEGIN, &[]);
        assert!(d.handle(CMD_RESET, &[]).status().is_ok());
        assert_eq!(d.state(), SessionState::Ready);
        assert!(d.handle(CMD_SET_MASTER_VOLUME, &[90]).status().is_ok());
    }

    #[test]
    fn test_repeated_begin_reuses_driver() {
        let mut built = 0;
        let mut d = Dispatcher::with_factory(Profile::Canonical, move || {
            built += 1;
            assert_eq!(built, 1, "driver factory called twice");
            RecordingDriver::new()
        });
        d.handle(CMD_BEGIN, &[]);
        d.handle(CMD_BEGIN, &[1, 2, 0x80, 0x25]);
        assert_eq!(calls(&d), 2);
        assert_eq!(
            d.driver().unwrap().calls()[1],
            Command::Begin { rx_pin: 1, tx_pin: 2, baud: 9600 }
        );
    }

    #[test]
    fn test_encoded_requests_round_trip_to_driver() {
        let mut d = dispatcher();
        d.handle(CMD_BEGIN, &[]);
        let commands = [
            Command::SetInstrument { bank: 0, channel: 0, instrument: 19 },
            Command::SetPitchBend { channel: 2, bend: -8192 },
            Command::SetChorus { channel: 3, program: 7, level: 1, feedback: 2, delay: 3 },
            Command::SetModWheel {
                channel: 4,
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
        for cmd in &commands {
            let request = cmd.encode(Profile::Canonical).unwrap();
            assert!(d.handle(request.id(), request.payload()).status().is_ok());
        }
        assert_eq!(&d.driver().unwrap().calls()[1..], &commands);
    }

    #[test]
    fn test_decoded_values_not_range_checked() {
        let mut d = dispatcher();
        d.handle(CMD_BEGIN, &[]);
        assert!(d.handle(CMD_SET_NOTE_ON, &[200, 200, 200]).status().is_ok());
        assert_eq!(
            d.driver().unwrap().calls()[1],
            Command::SetNoteOn { channel: 200, pitch: 200, velocity: 200 }
        );
    }

    #[test]
    fn test_legacy_profile() {
        let mut d = Dispatcher::<RecordingDriver>::new(Profile::Legacy);
        assert!(d.handle(LEGACY_CMD_INIT, &[]).status().is_ok());

        // Note-off without velocity defaults to 0
        assert!(d.handle(LEGACY_CMD_SET_NOTE_OFF, &[1, 60]).status().is_ok());
        assert_eq!(
            d.driver().unwrap().calls()[1],
            Command::SetNoteOff { channel: 1, pitch: 60, velocity: 0 }
        );

        // Reserved identifiers are unknown
        for id in [
            LEGACY_CMD_SET_TEMPO,
            LEGACY_CMD_SET_SUSTAIN,
            LEGACY_CMD_SET_TRANSPOSE,
            LEGACY_CMD_SET_MODULATION,
        ] {
            assert!(!d.handle(id, &[0, 0, 0]).status().is_ok());
        }
        assert_eq!(d.stats().unknown, 4);

        assert!(d.handle(LEGACY_CMD_SYSTEM_RESET, &[]).status().is_ok());
        assert_eq!(d.driver().unwrap().calls().last(), Some(&Command::Reset));
    }
}
