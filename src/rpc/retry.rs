use std::time::Duration;

use crate::config::RpcConfig;

/// Per-call timeout plus bounded exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RpcConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RpcConfig::default())
    }
}

const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Retry an async operation, bounding every attempt with the policy timeout.
/// Handles transient RPC errors (rate limits, network issues, stalls).
pub async fn retry_rpc<F, Fut, T, E>(policy: &RetryPolicy, method: &str, mut f: F) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = policy.initial_backoff;
    let attempts = policy.max_retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.timeout, f()).await {
            Ok(Ok(val)) => return Ok(val),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => {
                last_error = format!("timed out after {}ms", policy.timeout.as_millis())
            }
        }

        if attempt < attempts {
            tracing::debug!(
                method,
                attempt,
                attempts,
                error = %last_error,
                delay_ms = delay.as_millis() as u64,
                "RPC call failed, retrying..."
            );
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, MAX_BACKOFF);
        }
    }

    Err(eyre::eyre!(
        "{} failed after {} attempts: {}",
        method,
        attempts,
        last_error
    ))
}
