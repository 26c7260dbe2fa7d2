// Read-side aggregation: per-site mean latencies in period buckets.
// Pure over append-only rows, so it runs alongside the scheduler without coordination.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::instrument;

use crate::measurement_repo::MeasurementStore;
use crate::models::{Bucket, BucketKey, Measurement, Period};

#[derive(Default)]
struct Accumulator {
    ttfb_sum: f64,
    samples: usize,
    load_sum: f64,
    load_samples: usize,
}

/// Groups `measurements` by the period's bucket and averages each group.
/// Empty buckets are absent. Output is ascending by bucket.
pub fn bucket_measurements(period: Period, measurements: &[Measurement]) -> Vec<Bucket> {
    let mut by_key: BTreeMap<BucketKey, Accumulator> = BTreeMap::new();
    for m in measurements {
        let acc = by_key.entry(period.bucket_key(m.timestamp)).or_default();
        acc.ttfb_sum += m.ttfb;
        acc.samples += 1;
        if let Some(load) = m.load_delay {
            acc.load_sum += load;
            acc.load_samples += 1;
        }
    }

    by_key
        .into_iter()
        .map(|(label, acc)| Bucket {
            label,
            avg_ttfb: acc.ttfb_sum / acc.samples as f64,
            avg_load_delay: (acc.load_samples > 0)
                .then(|| acc.load_sum / acc.load_samples as f64),
            samples: acc.samples,
        })
        .collect()
}

/// Buckets for `site` over the period window that contains `today`.
#[instrument(skip(store), fields(operation = "aggregate"))]
pub async fn aggregate(
    store: &dyn MeasurementStore,
    period: Period,
    site: &str,
    today: NaiveDate,
) -> anyhow::Result<Vec<Bucket>> {
    let (from, to) = period.window(today);
    let rows = store.query_range(site, from, to).await?;
    Ok(bucket_measurements(period, &rows))
}
