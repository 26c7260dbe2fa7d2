// Staggered scheduler: walks the target list forever, one probe at a time.
// Target i of a cycle starts no earlier than cycle_start + i * inter_target_delay
// and no earlier than inter_target_delay after the previous target started;
// the next cycle starts at cycle_start + cycle_interval (or at once if that has passed).

use crate::measurement_repo::MeasurementStore;
use crate::models::Measurement;
use crate::probe::Prober;
use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::instrument;

/// Counters shared with the HTTP layer.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub cycles_completed: AtomicU64,
    pub measurements_saved: AtomicU64,
    pub probe_failures: AtomicU64,
    pub storage_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles_completed: u64,
    pub measurements_saved: u64,
    pub probe_failures: u64,
    pub storage_failures: u64,
}

impl SchedulerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            measurements_saved: self.measurements_saved.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
        }
    }
}

/// Prober, store, targets and shutdown for the scheduler. The prober is owned exclusively.
pub struct SchedulerDeps {
    pub prober: Box<dyn Prober>,
    pub store: Arc<dyn MeasurementStore>,
    pub targets: Arc<Vec<String>>,
    pub stats: Arc<SchedulerStats>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub inter_target_delay: Duration,
    pub cycle_interval: Duration,
}

impl SchedulerConfig {
    /// Idle time after the last target of a cycle, assuming probes take no time.
    /// Zero when the stagger alone fills the interval.
    pub fn idle_after_last_target(&self, target_count: usize) -> Duration {
        let spread = self
            .inter_target_delay
            .saturating_mul(target_count.saturating_sub(1) as u32);
        self.cycle_interval.saturating_sub(spread)
    }
}

pub fn spawn(deps: SchedulerDeps, config: SchedulerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(deps, config))
}

/// Signals shutdown and waits for the task, which releases the prober on its way out.
pub async fn stop(shutdown_tx: oneshot::Sender<()>, handle: tokio::task::JoinHandle<()>) {
    let _ = shutdown_tx.send(());
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "scheduler task failed");
    }
}

/// Runs until the shutdown signal fires (or its sender is dropped), then releases the prober.
#[instrument(skip_all, fields(targets = deps.targets.len(), cycle_interval_secs = config.cycle_interval.as_secs()))]
pub async fn run(deps: SchedulerDeps, config: SchedulerConfig) {
    let SchedulerDeps {
        prober,
        store,
        targets,
        stats,
        mut shutdown_rx,
    } = deps;

    if config.idle_after_last_target(targets.len()).is_zero() {
        tracing::warn!(
            targets = targets.len(),
            inter_target_delay_secs = config.inter_target_delay.as_secs(),
            cycle_interval_secs = config.cycle_interval.as_secs(),
            "stagger fills the whole cycle; cycles will run back to back"
        );
    }

    let mut cycle: u64 = 0;
    loop {
        let cycle_start = Instant::now();
        let flow = run_cycle(
            prober.as_ref(),
            store.as_ref(),
            &targets,
            &stats,
            &config,
            cycle_start,
            &mut shutdown_rx,
        )
        .await;
        if flow.is_break() {
            break;
        }
        cycle += 1;
        stats.cycles_completed.fetch_add(1, Ordering::Relaxed);

        let next_cycle = deadline_after(cycle_start, config.cycle_interval);
        if Instant::now() > next_cycle {
            tracing::warn!(
                cycle,
                overrun_ms = (Instant::now() - next_cycle).as_millis() as u64,
                "cycle overran its interval; starting next cycle immediately"
            );
        }
        if wait_until(next_cycle, &mut shutdown_rx).await.is_break() {
            break;
        }
    }

    tracing::debug!("Scheduler shutting down");
    prober.shutdown().await;
}

async fn run_cycle(
    prober: &dyn Prober,
    store: &dyn MeasurementStore,
    targets: &[String],
    stats: &SchedulerStats,
    config: &SchedulerConfig,
    cycle_start: Instant,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> ControlFlow<()> {
    let mut saved: u32 = 0;
    let mut failed: u32 = 0;

    let mut prev_start: Option<Instant> = None;

    for (i, site) in targets.iter().enumerate() {
        if let Some(prev) = prev_start {
            // A late probe pushes every following slot back.
            let planned = deadline_after(
                cycle_start,
                config.inter_target_delay.saturating_mul(i as u32),
            );
            let slot = planned.max(deadline_after(prev, config.inter_target_delay));
            wait_until(slot, shutdown_rx).await?;
        }
        prev_start = Some(Instant::now());

        let result = tokio::select! {
            biased;
            _ = &mut *shutdown_rx => return ControlFlow::Break(()),
            result = prober.probe(site) => result,
        };

        match result {
            Ok(outcome) => {
                let measurement = Measurement::new(
                    site.as_str(),
                    chrono::Local::now().naive_local(),
                    outcome.ttfb,
                    outcome.load_delay,
                );
                tracing::info!(
                    site = %site,
                    ttfb = outcome.ttfb,
                    load_delay = outcome.load_delay,
                    "measured"
                );
                match store.append(&measurement).await {
                    Ok(()) => {
                        saved += 1;
                        stats.measurements_saved.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        stats.storage_failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            site = %site,
                            error = %e,
                            operation = "append",
                            "failed to save measurement"
                        );
                    }
                }
            }
            Err(e) => {
                failed += 1;
                stats.probe_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(site = %site, error = %e, operation = "probe", "probe failed");
            }
        }
    }

    tracing::info!(
        saved,
        failed,
        elapsed_secs = cycle_start.elapsed().as_secs(),
        "cycle complete"
    );
    ControlFlow::Continue(())
}

/// `base + offset`, or a far-future instant when that overflows.
fn deadline_after(base: Instant, offset: Duration) -> Instant {
    base.checked_add(offset)
        .unwrap_or_else(|| base + Duration::from_secs(86400 * 365 * 30))
}

/// Sleeps until `deadline` (returns at once if it has passed) unless shutdown fires first.
async fn wait_until(deadline: Instant, shutdown_rx: &mut oneshot::Receiver<()>) -> ControlFlow<()> {
    tokio::select! {
        biased;
        _ = &mut *shutdown_rx => ControlFlow::Break(()),
        _ = sleep_until(deadline) => ControlFlow::Continue(()),
    }
}
