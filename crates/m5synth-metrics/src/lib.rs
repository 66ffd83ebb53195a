//! Metrics for the synth host and firmware.
//!
//! Every metric is declared once as a const [`Metric`] so that names, units
//! and label keys live in one place. The `metrics` crate is re-exported; no
//! recorder is installed here, so emission is a no-op until the embedding
//! application installs one.
//!
//! # Example
//!
//! ```rust
//! use m5synth_metrics::{metric_defs, MetricKind};
//!
//! assert_eq!(metric_defs::DEVICE_COMMANDS.kind, MetricKind::Counter);
//! metrics::counter!(metric_defs::DEVICE_COMMANDS.name, "operation" => "reset", "result" => "ok")
//!     .increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// One metric: name, kind, unit and the label keys it is emitted with.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub unit: Unit,
    pub description: &'static str,
    /// Label keys, in emission order.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn declare(
        kind: MetricKind,
        name: &'static str,
        unit: Unit,
        labels: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Metric { name, kind, unit, description, labels }
    }

    /// Registers the description and unit with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, MetricKind, Unit};

    // ========================================================================
    // Device (firmware dispatcher)
    // ========================================================================

    /// Commands handled by a dispatcher.
    ///
    /// `result` is one of `ok`, `not_ready`, `malformed`, `unknown`.
    /// `operation` is `unknown` for unrecognised identifiers.
    pub const DEVICE_COMMANDS: Metric = Metric::declare(
        MetricKind::Counter,
        "m5synth.device.commands",
        Unit::Count,
        &["device", "profile", "operation", "result"],
        "Commands handled by the firmware dispatcher",
    );

    /// Frames dropped by the device UART loop because of an illegal length.
    pub const DEVICE_BAD_FRAMES: Metric = Metric::declare(
        MetricKind::Counter,
        "m5synth.device.bad_frames",
        Unit::Count,
        &["device"],
        "Frames dropped because of an illegal length field",
    );

    /// Simulated devices currently connected to the TCP server.
    pub const DEVICE_CONNECTIONS: Metric = Metric::declare(
        MetricKind::Gauge,
        "m5synth.device.connections",
        Unit::Count,
        &[],
        "Simulated devices with a connected host",
    );

    // ========================================================================
    // Host (client)
    // ========================================================================

    /// Requests issued by the host client.
    ///
    /// `result` is one of `ok`, `failed`, `invalid`, `transport_error`.
    pub const HOST_REQUESTS: Metric = Metric::declare(
        MetricKind::Counter,
        "m5synth.host.requests",
        Unit::Count,
        &["operation", "result"],
        "Requests issued by the host client",
    );

    pub const HOST_ROUND_TRIP: Metric = Metric::declare(
        MetricKind::Histogram,
        "m5synth.host.round_trip_us",
        Unit::Microseconds,
        &["operation"],
        "Request/response round-trip time in microseconds",
    );

    /// Every metric, in the order `describe_metrics` registers them.
    pub const ALL: &[&Metric] = &[
        &DEVICE_COMMANDS,
        &DEVICE_BAD_FRAMES,
        &DEVICE_CONNECTIONS,
        &HOST_REQUESTS,
        &HOST_ROUND_TRIP,
    ];
}

/// Labels identifying one simulated device.
#[derive(Debug, Clone)]
pub struct DeviceLabels {
    /// Device name.
    pub device: String,
    /// Command table in use.
    pub profile: String,
}

impl DeviceLabels {
    pub fn new(device: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            profile: profile.into(),
        }
    }

    /// Label set for [`metric_defs::DEVICE_COMMANDS`].
    pub fn command(&self, operation: &str, result: &str) -> Vec<(&'static str, String)> {
        vec![
            ("device", self.device.clone()),
            ("profile", self.profile.clone()),
            ("operation", operation.to_string()),
            ("result", result.to_string()),
        ]
    }
}

/// Describes all metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_labels_match_declaration() {
        let labels = DeviceLabels::new("synth-0", "canonical").command("reset", "ok");
        let keys: Vec<_> = labels.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, metric_defs::DEVICE_COMMANDS.labels);
        assert_eq!(labels[0].1, "synth-0");
        assert_eq!(labels[3].1, "ok");
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::DEVICE_COMMANDS.name, "m5synth.device.commands");
        assert_eq!(metric_defs::DEVICE_COMMANDS.labels.len(), 4);
        assert_eq!(metric_defs::DEVICE_CONNECTIONS.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::HOST_ROUND_TRIP.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::HOST_ROUND_TRIP.unit, Unit::Microseconds);
        assert_eq!(metric_defs::ALL.len(), 5);
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
