use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounded exponential backoff for idempotent reads.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl BackoffConfig {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent. The last error is returned.
pub async fn with_backoff<T, E, F, Fut>(
    cfg: &BackoffConfig,
    label: &str,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if retry < cfg.max_retries && is_transient(&e) => {
                let delay = cfg.delay_for(retry);
                warn!(%label, attempt = retry + 1, ?delay, "transient failure, retrying: {}", e);
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
