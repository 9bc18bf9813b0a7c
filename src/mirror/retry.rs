use crate::{config::MirrorConfig, metrics, mirror::GenerationError};
use std::{future::Future, time::Duration};
use tracing::warn;

/// Fixed-delay retry policy for whole-Mirror assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_secs(2),
        }
    }
}

impl From<&MirrorConfig> for RetryPolicy {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted
///
/// Every attempt gets identical input. The last error is returned unchanged.
pub async fn generate_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if retries < policy.max_retries => {
                retries += 1;
                warn!(
                    operation = %operation,
                    attempt = retries,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Mirror assembly failed, retrying"
                );
                metrics::record_retry(operation);
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
