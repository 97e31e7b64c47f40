//! Keep-alive scheduler
//!
//! Some hosts put idle processes to sleep, which makes the platform's
//! webhook calls time out. Pinging our own liveness endpoint keeps the
//! process warm.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::time::interval;

/// Keep-alive loop that runs in the background
pub struct KeepAlive {
    client: reqwest::Client,
    url: String,
    period: Duration,
    consecutive_failures: Arc<RwLock<u32>>,
}

impl KeepAlive {
    pub fn new(client: reqwest::Client, url: impl Into<String>, period_secs: u64) -> Self {
        Self {
            client,
            url: url.into(),
            period: Duration::from_secs(period_secs.max(1)),
            consecutive_failures: Arc::new(RwLock::new(0)),
        }
    }

    /// Start the keep-alive loop
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting keep-alive for {} (every {}s)",
            self.url,
            self.period.as_secs()
        );

        let mut interval_timer = interval(self.period);
        // The first tick fires immediately and the server is already warm
        interval_timer.tick().await;

        loop {
            interval_timer.tick().await;
            self.ping_once().await;
        }
    }

    /// Ping the URL once, tracking consecutive failures
    async fn ping_once(&self) -> bool {
        let result = self.ping().await;

        let mut failures = self.consecutive_failures.write().await;
        match result {
            Ok(elapsed_ms) => {
                if *failures > 0 {
                    tracing::info!("Keep-alive recovered after {} failures", *failures);
                }
                *failures = 0;
                tracing::debug!("Keep-alive ok ({}ms)", elapsed_ms);
                true
            }
            Err(e) => {
                *failures += 1;
                tracing::warn!(
                    "Keep-alive failed for {}: {} (consecutive failures = {})",
                    self.url,
                    e,
                    *failures
                );
                false
            }
        }
    }

    async fn ping(&self) -> Result<u128, String> {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "timeout".to_string()
                } else if e.is_connect() {
                    "connection_failed".to_string()
                } else {
                    e.to_string()
                }
            })?;

        if response.status().is_success() {
            Ok(start.elapsed().as_millis())
        } else {
            Err(response.status().as_u16().to_string())
        }
    }

    #[cfg(test)]
    pub async fn consecutive_failures(&self) -> u32 {
        *self.consecutive_failures.read().await
    }
}
