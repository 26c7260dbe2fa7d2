// Schema for the append-only measurements table.

use sqlx::SqlitePool;

/// Creates the measurements table and its (site, timestamp) index if not present.
pub(super) async fn init_measurements_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            ttfb REAL NOT NULL,
            load_delay REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_measurements_site_timestamp ON measurements(site, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
