// Render phase: a single headless Chrome, launched once and reused for every probe.

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

use super::ProbeError;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct BrowserSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: Mutex<Option<JoinHandle<()>>>,
    render_timeout: Duration,
}

impl BrowserSession {
    /// Launches headless Chrome and opens the page every probe navigates in.
    pub async fn launch(
        chrome_executable: Option<PathBuf>,
        render_timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage");
        if let Some(path) = chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ProbeError::Launch)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
            tracing::debug!("browser handler finished");
        });

        let page = browser.new_page("about:blank").await?;
        tracing::info!("headless browser launched");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler: Mutex::new(Some(handler)),
            render_timeout,
        })
    }

    /// Navigates to `site` and waits for `document.readyState == "complete"`.
    pub async fn measure_load(&self, site: &str) -> Result<Duration, ProbeError> {
        let start = Instant::now();
        timeout(self.render_timeout, self.navigate_until_ready(site))
            .await
            .map_err(|_| ProbeError::RenderTimeout(self.render_timeout))??;
        Ok(start.elapsed())
    }

    async fn navigate_until_ready(&self, site: &str) -> Result<(), ProbeError> {
        self.page.goto(site).await?;
        loop {
            let state: String = self
                .page
                .evaluate("document.readyState")
                .await?
                .into_value()
                .map_err(|e| ProbeError::Other(format!("readyState: {}", e)))?;
            if state == "complete" {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Closes the browser process and stops the handler task. Safe to call twice.
    pub async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "browser close failed");
            }
            if let Err(e) = browser.wait().await {
                tracing::warn!(error = %e, "browser wait failed");
            }
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        tracing::info!("headless browser closed");
    }
}
