// One latency sample for one target, as persisted.

use chrono::{NaiveDateTime, SubsecRound};

/// Storage and wire format for timestamps (local time, second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Immutable once written. `load_delay` is `None` when only the network phase ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub site: String,
    pub timestamp: NaiveDateTime,
    pub ttfb: f64,
    pub load_delay: Option<f64>,
}

impl Measurement {
    /// Builds a measurement, truncating `timestamp` to whole seconds.
    pub fn new(
        site: impl Into<String>,
        timestamp: NaiveDateTime,
        ttfb: f64,
        load_delay: Option<f64>,
    ) -> Self {
        Self {
            site: site.into(),
            timestamp: timestamp.trunc_subsecs(0),
            ttfb,
            load_delay,
        }
    }

    pub fn timestamp_str(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}
