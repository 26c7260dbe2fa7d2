use anyhow::Result;
use sitemonitor::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn build_prober(config: &config::ProbeConfig) -> Result<probe::LatencyProber> {
    let http = probe::HttpProbe::new(Duration::from_secs(config.http_timeout_secs))?;
    let browser = if config.browser_enabled {
        Some(
            probe::BrowserSession::launch(
                config.chrome_executable.clone(),
                Duration::from_secs(config.render_timeout_secs),
            )
            .await?,
        )
    } else {
        tracing::info!("browser disabled; measuring TTFB only");
        None
    };
    Ok(probe::LatencyProber::new(http, browser))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let targets = Arc::new(app_config.targets.sites.clone());

    let repo = Arc::new(
        measurement_repo::MeasurementRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;
    let stored_sites = repo.sites().await?;
    let unconfigured = stored_sites
        .iter()
        .filter(|s| !targets.contains(s))
        .count();
    tracing::info!(
        stored_sites = stored_sites.len(),
        unconfigured,
        targets = targets.len(),
        "measurement store ready"
    );
    let store: Arc<dyn measurement_repo::MeasurementStore> = repo.clone();

    let prober = build_prober(&app_config.probe).await?;
    let stats = Arc::new(scheduler::SchedulerStats::default());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let scheduler_handle = scheduler::spawn(
        scheduler::SchedulerDeps {
            prober: Box::new(prober),
            store: store.clone(),
            targets: targets.clone(),
            stats: stats.clone(),
            shutdown_rx,
        },
        app_config.scheduler.to_scheduler_config(),
    );

    let app = routes::app(store, targets, stats, app_config.api.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let served = tokio::select! {
        result = axum::serve(listener, app) => result,
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            Ok(())
        }
    };
    if let Err(e) = &served {
        tracing::error!(error = %e, "server stopped");
    }

    // Runs on both paths so the browser is closed, not just dropped.
    scheduler::stop(shutdown_tx, scheduler_handle).await;
    repo.close().await;

    served?;
    Ok(())
}
