//! Metric definitions for the synchronizer.
//!
//! Metrics are recorded through the `metrics` facade. Nothing is exported
//! unless the application installs a recorder.

use metrics::{describe_counter, Unit};

/// A counter definition with its description.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: Option<Unit>,
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match self.unit {
            Some(unit) => describe_counter!(self.name, unit, self.description),
            None => describe_counter!(self.name, self.description),
        }
    }
}

/// All synchronizer metrics.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Requests sent to the device.
    ///
    /// Labels: command
    pub const REQUESTS_SENT: Metric = Metric::counter("shadesync.requests_sent")
        .with_description("Requests sent to the device")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    /// Requests that got no response in time.
    ///
    /// Labels: command
    pub const REQUEST_TIMEOUTS: Metric = Metric::counter("shadesync.request_timeouts")
        .with_description("Requests that timed out")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    /// Updates and actions the device declined.
    ///
    /// Labels: command
    pub const APPLY_REJECTIONS: Metric = Metric::counter("shadesync.apply_rejections")
        .with_description("Updates rejected by the device")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    /// Telemetry pushes merged into the device status.
    pub const TELEMETRY_MERGED: Metric = Metric::counter("shadesync.telemetry_merged")
        .with_description("Telemetry packets merged into the device status")
        .with_unit(Unit::Count);

    /// Full loads that reached `Ready`.
    pub const LOADS_COMPLETED: Metric = Metric::counter("shadesync.loads_completed")
        .with_description("Completed state and configuration loads")
        .with_unit(Unit::Count);

    pub const ALL: &[Metric] = &[
        REQUESTS_SENT,
        REQUEST_TIMEOUTS,
        APPLY_REJECTIONS,
        TELEMETRY_MERGED,
        LOADS_COMPLETED,
    ];
}

/// Describe all metrics with the installed recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_unique() {
        let names: HashSet<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(metric_defs::ALL
            .iter()
            .all(|m| m.name.starts_with("shadesync.") && !m.description.is_empty()));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
