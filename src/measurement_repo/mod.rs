// SQLite measurement store. One append-only table; readers and the single writer
// share the pool, WAL keeps readers off the writer's lock.

mod schema;

use crate::models::{Measurement, TIMESTAMP_FORMAT};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Persistence seam shared by the scheduler (writer) and the HTTP layer (readers).
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Appends one row. Rows are never updated or deleted.
    async fn append(&self, measurement: &Measurement) -> anyhow::Result<()>;

    /// Rows for `site` with `from <= timestamp <= to`, ascending by timestamp.
    async fn query_range(
        &self,
        site: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> anyhow::Result<Vec<Measurement>>;

    /// The `limit` most recent rows for `site`, returned oldest-first.
    async fn query_latest(&self, site: &str, limit: u32) -> anyhow::Result<Vec<Measurement>>;
}

pub struct MeasurementRepo {
    pool: SqlitePool,
}

impl MeasurementRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Idempotent; must run before the first append.
    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_measurements_table(&self.pool).await
    }

    /// Distinct sites that have at least one stored row.
    pub async fn sites(&self) -> anyhow::Result<Vec<String>> {
        let sites = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT site FROM measurements ORDER BY site",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sites)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Measurement> {
        let site: String = row.try_get("site")?;
        let timestamp: String = row.try_get("timestamp")?;
        let ttfb: f64 = row.try_get("ttfb")?;
        let load_delay: Option<f64> = row.try_get("load_delay")?;
        let timestamp = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| anyhow::anyhow!("bad timestamp {:?}: {}", timestamp, e))?;
        Ok(Measurement {
            site,
            timestamp,
            ttfb,
            load_delay,
        })
    }
}

#[async_trait]
impl MeasurementStore for MeasurementRepo {
    #[instrument(skip(self, measurement), fields(repo = "measurements", operation = "append", site = %measurement.site))]
    async fn append(&self, measurement: &Measurement) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO measurements (site, timestamp, ttfb, load_delay) VALUES ($1, $2, $3, $4)",
        )
        .bind(&measurement.site)
        .bind(measurement.timestamp_str())
        .bind(measurement.ttfb)
        .bind(measurement.load_delay)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "measurements", operation = "query_range"))]
    async fn query_range(
        &self,
        site: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> anyhow::Result<Vec<Measurement>> {
        let rows = sqlx::query(
            "SELECT site, timestamp, ttfb, load_delay FROM measurements
             WHERE site = $1 AND timestamp >= $2 AND timestamp <= $3
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(site)
        .bind(from.format(TIMESTAMP_FORMAT).to_string())
        .bind(to.format(TIMESTAMP_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_row).collect()
    }

    #[instrument(skip(self), fields(repo = "measurements", operation = "query_latest"))]
    async fn query_latest(&self, site: &str, limit: u32) -> anyhow::Result<Vec<Measurement>> {
        let rows = sqlx::query(
            "SELECT site, timestamp, ttfb, load_delay FROM measurements
             WHERE site = $1 ORDER BY timestamp DESC, id DESC LIMIT $2",
        )
        .bind(site)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = rows
            .iter()
            .map(Self::parse_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        out.reverse();
        Ok(out)
    }
}
