use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::SchedulerConfig;

/// Hard cap on rows returned by the recent-measurements endpoint.
pub const MAX_RECENT_LIMIT: u32 = 1000;
/// Upper bound for scheduler delays and intervals (one day).
pub const MAX_SCHEDULE_SECS: u64 = 86_400;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub targets: TargetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Spacing between consecutive target probes within a cycle.
    #[serde(default = "default_inter_target_delay_secs")]
    pub inter_target_delay_secs: u64,
    /// Start-to-start period of a full pass over the target list.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
}

fn default_inter_target_delay_secs() -> u64 {
    60
}

fn default_cycle_interval_secs() -> u64 {
    600
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            inter_target_delay_secs: default_inter_target_delay_secs(),
            cycle_interval_secs: default_cycle_interval_secs(),
        }
    }
}

impl SchedulerSection {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            inter_target_delay: Duration::from_secs(self.inter_target_delay_secs),
            cycle_interval: Duration::from_secs(self.cycle_interval_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Upper bound on navigation + ready-state wait; a hung page must not stall the cycle.
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,
    /// When false only TTFB is measured and load_delay is stored as NULL.
    #[serde(default = "default_browser_enabled")]
    pub browser_enabled: bool,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_render_timeout_secs() -> u64 {
    60
}

fn default_browser_enabled() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            render_timeout_secs: default_render_timeout_secs(),
            browser_enabled: default_browser_enabled(),
            chrome_executable: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Default row count for GET /api/recent.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

fn default_recent_limit() -> u32 {
    50
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
        }
    }
}

/// Ordered target list. Order sets the stagger slots and stays fixed across cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetsConfig {
    pub sites: Vec<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            (1..=MAX_SCHEDULE_SECS).contains(&self.scheduler.inter_target_delay_secs),
            "scheduler.inter_target_delay_secs must be between 1 and {}, got {}",
            MAX_SCHEDULE_SECS,
            self.scheduler.inter_target_delay_secs
        );
        anyhow::ensure!(
            (1..=MAX_SCHEDULE_SECS).contains(&self.scheduler.cycle_interval_secs),
            "scheduler.cycle_interval_secs must be between 1 and {}, got {}",
            MAX_SCHEDULE_SECS,
            self.scheduler.cycle_interval_secs
        );
        anyhow::ensure!(
            self.probe.http_timeout_secs > 0,
            "probe.http_timeout_secs must be > 0, got {}",
            self.probe.http_timeout_secs
        );
        anyhow::ensure!(
            self.probe.render_timeout_secs > 0,
            "probe.render_timeout_secs must be > 0, got {}",
            self.probe.render_timeout_secs
        );
        anyhow::ensure!(
            (1..=MAX_RECENT_LIMIT).contains(&self.api.recent_limit),
            "api.recent_limit must be between 1 and {}, got {}",
            MAX_RECENT_LIMIT,
            self.api.recent_limit
        );
        anyhow::ensure!(
            !self.targets.sites.is_empty(),
            "targets.sites must list at least one site"
        );
        let mut seen = HashSet::new();
        for site in &self.targets.sites {
            let url = reqwest::Url::parse(site)
                .map_err(|e| anyhow::anyhow!("targets.sites: invalid URL {:?}: {}", site, e))?;
            anyhow::ensure!(
                matches!(url.scheme(), "http" | "https"),
                "targets.sites: {:?} must be an http or https URL",
                site
            );
            anyhow::ensure!(
                seen.insert(site.as_str()),
                "targets.sites: duplicate site {:?}",
                site
            );
        }
        Ok(())
    }
}
