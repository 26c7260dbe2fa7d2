// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sitemonitor::measurement_repo::{MeasurementRepo, MeasurementStore};
use sitemonitor::models::Measurement;
use sitemonitor::probe::{ProbeError, ProbeOutcome, Prober};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::time::{Duration, Instant};

pub fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, s).unwrap()
}

pub fn measurement(site: &str, ts: NaiveDateTime, ttfb: f64) -> Measurement {
    Measurement::new(site, ts, ttfb, None)
}

/// SQLite repo in a fresh temp dir. Keep the TempDir alive for the test.
pub async fn temp_repo() -> (TempDir, MeasurementRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sitemonitor.db");
    let repo = MeasurementRepo::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

/// In-memory store with the same ordering contract as the SQLite repo.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Measurement>>,
    fail_appends: AtomicBool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_appends.store(true, Ordering::SeqCst);
        store
    }

    pub fn rows(&self) -> Vec<Measurement> {
        self.rows.lock().unwrap().clone()
    }

    pub fn count_for(&self, site: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.site == site)
            .count()
    }
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn append(&self, measurement: &Measurement) -> anyhow::Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        self.rows.lock().unwrap().push(measurement.clone());
        Ok(())
    }

    async fn query_range(
        &self,
        site: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> anyhow::Result<Vec<Measurement>> {
        let mut out: Vec<Measurement> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.site == site && m.timestamp >= from && m.timestamp <= to)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.timestamp);
        Ok(out)
    }

    async fn query_latest(&self, site: &str, limit: u32) -> anyhow::Result<Vec<Measurement>> {
        let mut out: Vec<Measurement> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.site == site)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.timestamp);
        let skip = out.len().saturating_sub(limit as usize);
        Ok(out.split_off(skip))
    }
}

/// Records when each probe started. Sites in `failing` return an error; every probe
/// takes `probe_time` on the tokio clock.
pub struct ScriptedProber {
    pub calls: Arc<Mutex<Vec<(String, Instant)>>>,
    pub shut_down: Arc<AtomicBool>,
    failing: HashSet<String>,
    probe_time: Duration,
}

impl ScriptedProber {
    pub fn new(failing: &[&str], probe_time: Duration) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            shut_down: Arc::new(AtomicBool::new(false)),
            failing: failing.iter().map(|s| s.to_string()).collect(),
            probe_time,
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, site: &str) -> Result<ProbeOutcome, ProbeError> {
        self.calls
            .lock()
            .unwrap()
            .push((site.to_string(), Instant::now()));
        tokio::time::sleep(self.probe_time).await;
        if self.failing.contains(site) {
            return Err(ProbeError::Other(format!("{} unreachable", site)));
        }
        Ok(ProbeOutcome {
            ttfb: 0.25,
            load_delay: Some(1.5),
        })
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}
