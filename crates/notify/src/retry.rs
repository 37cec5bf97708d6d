//! Bounded retry wrapper for channel adapters.

use std::sync::Arc;
use std::time::Duration;

use crate::payload::ChannelPayload;
use crate::traits::{ChannelAdapter, NotifyError};

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retries retryable failures of the wrapped adapter with exponential
/// backoff. A `RateLimited` response sleeps for the advertised delay
/// instead.
pub struct RetryingAdapter {
    inner: Arc<dyn ChannelAdapter>,
    max_attempts: u32,
    backoff: Duration,
}

impl RetryingAdapter {
    pub fn new(inner: Arc<dyn ChannelAdapter>, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn delay_for(&self, attempt: u32, error: &NotifyError) -> Duration {
        let delay = match error {
            NotifyError::RateLimited { retry_after_secs } => Duration::from_secs(*retry_after_secs),
            _ => self.backoff.saturating_mul(2u32.saturating_pow(attempt - 1)),
        };
        delay.min(MAX_BACKOFF)
    }
}

#[async_trait::async_trait]
impl ChannelAdapter for RetryingAdapter {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<(), NotifyError> {
        let mut attempt = 1;
        loop {
            match self.inner.deliver(payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts && e.is_retryable() => {
                    let delay = self.delay_for(attempt, &e);
                    tracing::warn!(
                        channel = self.inner.channel_name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn channel_name(&self) -> &str {
        self.inner.channel_name()
    }
}
