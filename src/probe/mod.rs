// Latency prober: network TTFB followed by a headless-browser render, run back to back.

mod browser;
mod http;

pub use browser::BrowserSession;
pub use http::HttpProbe;

use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("browser automation failed: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("page did not reach ready state within {0:?}")]
    RenderTimeout(Duration),
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("{0}")]
    Other(String),
}

/// Both latencies of one successful probe, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub ttfb: f64,
    pub load_delay: Option<f64>,
}

/// One measurement of one target. Implementations must not persist anything.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, site: &str) -> Result<ProbeOutcome, ProbeError>;

    /// Releases long-lived resources. Called once when the scheduler exits.
    async fn shutdown(&self) {}
}

/// Production prober. The browser session is optional: without it only TTFB is measured.
pub struct LatencyProber {
    http: HttpProbe,
    browser: Option<BrowserSession>,
}

impl LatencyProber {
    pub fn new(http: HttpProbe, browser: Option<BrowserSession>) -> Self {
        Self { http, browser }
    }
}

#[async_trait]
impl Prober for LatencyProber {
    #[instrument(skip(self), fields(operation = "probe"))]
    async fn probe(&self, site: &str) -> Result<ProbeOutcome, ProbeError> {
        let ttfb = self.http.measure_ttfb(site).await?;
        let load_delay = match &self.browser {
            Some(browser) => Some(browser.measure_load(site).await?),
            None => None,
        };
        Ok(ProbeOutcome {
            ttfb: ttfb.as_secs_f64(),
            load_delay: load_delay.map(|d| d.as_secs_f64()),
        })
    }

    async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.close().await;
        }
    }
}
