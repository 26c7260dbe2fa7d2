// Domain models

mod aggregate;
mod measurement;

pub use aggregate::{Bucket, BucketKey, Half, ParsePeriodError, Period, SiteAggregate};
pub use measurement::{Measurement, TIMESTAMP_FORMAT};
