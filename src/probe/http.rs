// Network phase: time from sending the request until response headers arrive.

use std::time::Duration;
use tokio::time::Instant;

use super::ProbeError;

pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // Time the target itself, not the redirect chain.
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Any status code counts as a response, redirects included; the body is never read.
    pub async fn measure_ttfb(&self, site: &str) -> Result<Duration, ProbeError> {
        let start = Instant::now();
        let response = self.client.get(site).send().await?;
        let elapsed = start.elapsed();
        tracing::debug!(site, status = response.status().as_u16(), "headers received");
        Ok(elapsed)
    }
}
