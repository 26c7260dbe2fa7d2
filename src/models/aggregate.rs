// Aggregation periods and the buckets they produce. Derived on demand, never stored.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Serialize, Serializer};

/// Reporting period for `aggregate`. Each variant owns its window and bucketing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Hour-of-day buckets for the current calendar day.
    Intraday,
    /// AM/PM buckets per day over today and the 6 days before it.
    Weekly,
    /// Day buckets over the current calendar month.
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period {0:?} (expected daily, weekly or monthly)")]
pub struct ParsePeriodError(pub String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "intraday" => Ok(Period::Intraday),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            _ => Err(ParsePeriodError(s.to_string())),
        }
    }
}

impl Period {
    /// Inclusive `[from, to]` window of the period containing `today`.
    pub fn window(self, today: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let (first, last) = match self {
            Period::Intraday => (today, today),
            Period::Weekly => (today - Days::new(6), today),
            Period::Monthly => {
                let first = today - Days::new(u64::from(today.day0()));
                (first, first + Months::new(1) - Days::new(1))
            }
        };
        (start_of_day(first), end_of_day(last))
    }

    /// Bucket a timestamp falls into for this period.
    pub fn bucket_key(self, ts: NaiveDateTime) -> BucketKey {
        match self {
            Period::Intraday => BucketKey::Hour(ts.hour()),
            Period::Weekly => BucketKey::HalfDay {
                day: ts.date(),
                half: Half::of(ts),
            },
            Period::Monthly => BucketKey::Day(ts.date()),
        }
    }
}

fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

// Timestamps are whole seconds, so the last second of the day closes the window.
fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    start_of_day(day + Days::new(1)) - TimeDelta::seconds(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Half {
    Am,
    Pm,
}

impl Half {
    /// Hours 00-11 are AM, 12-23 are PM.
    pub fn of(ts: NaiveDateTime) -> Self {
        if ts.hour() < 12 { Half::Am } else { Half::Pm }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::Am => f.write_str("AM"),
            Half::Pm => f.write_str("PM"),
        }
    }
}

/// Bucket label. Ordering is chronological within a single period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Hour(u32),
    HalfDay { day: NaiveDate, half: Half },
    Day(NaiveDate),
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Hour(h) => write!(f, "{:02}", h),
            BucketKey::HalfDay { day, half } => write!(f, "{} {}", day.format("%Y-%m-%d"), half),
            BucketKey::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mean latencies for one bucket. Only buckets with at least one sample exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: BucketKey,
    pub avg_ttfb: f64,
    pub avg_load_delay: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteAggregate {
    pub site: String,
    pub buckets: Vec<Bucket>,
}
