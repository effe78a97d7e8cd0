//! Fault-tolerant read loop over the configured RPC endpoint pool.
//!
//! Endpoints are tried in configured order; each gets a bounded number of
//! attempts with linearly growing backoff before the next endpoint is
//! tried. A contract revert short-circuits the whole loop: it is a
//! deterministic answer, not an outage, and retrying it elsewhere only
//! burns rate limit.

use crate::errors::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct FallbackReader {
    endpoints: Vec<String>,
    max_retries_per_endpoint: u32,
    backoff_base: Duration,
}

impl FallbackReader {
    pub fn new(endpoints: Vec<String>, max_retries_per_endpoint: u32, backoff_base: Duration) -> Self {
        Self {
            endpoints,
            max_retries_per_endpoint: max_retries_per_endpoint.max(1),
            backoff_base,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Run `op` against each endpoint in order with the configured retry
    /// budget, returning the first success. After full exhaustion the
    /// last error per endpoint is folded into one aggregate failure.
    pub async fn read<T, F, Fut>(&self, op: F) -> Result<T, ProviderError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.read_with_budget(op, self.max_retries_per_endpoint).await
    }

    pub async fn read_with_budget<T, F, Fut>(
        &self,
        op: F,
        max_retries_per_endpoint: u32,
    ) -> Result<T, ProviderError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if self.endpoints.is_empty() {
            return Err(ProviderError::Exhausted("no RPC endpoints configured".into()));
        }

        let budget = max_retries_per_endpoint.max(1);
        let mut failures: Vec<String> = Vec::new();

        for endpoint in &self.endpoints {
            for attempt in 1..=budget {
                match op(endpoint.clone()).await {
                    Ok(value) => return Ok(value),
                    Err(ProviderError::Revert(msg)) => return Err(ProviderError::Revert(msg)),
                    Err(err) => {
                        warn!(
                            endpoint = endpoint.as_str(),
                            attempt,
                            error = %err,
                            "contract read attempt failed"
                        );
                        if attempt == budget {
                            failures.push(format!("{} (attempt {}): {}", endpoint, attempt, err));
                        } else {
                            tokio::time::sleep(self.backoff_base * attempt).await;
                        }
                    }
                }
            }
        }

        Err(ProviderError::Exhausted(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn reader(endpoints: &[&str], retries: u32) -> FallbackReader {
        FallbackReader::new(
            endpoints.iter().map(|s| s.to_string()).collect(),
            retries,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn first_endpoint_down_second_healthy() {
        let reader = reader(&["http://rpc-1", "http://rpc-2"], 2);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = reader
            .read(move |endpoint| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if endpoint == "http://rpc-1" {
                        Err(ProviderError::Transport {
                            endpoint,
                            message: "connection refused".into(),
                        })
                    } else {
                        Ok(42u64)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        // two failed attempts on endpoint 1, one success on endpoint 2
        let total = attempts.load(Ordering::SeqCst);
        assert!(total <= 2 * 2, "total attempts {} exceeded retries x endpoints", total);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn revert_short_circuits_without_fallback() {
        let reader = reader(&["http://rpc-1", "http://rpc-2"], 3);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<u64, _> = reader
            .read(move |_endpoint| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Revert("index out of bounds".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Revert(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_aggregates_every_endpoint() {
        let reader = reader(&["http://rpc-1", "http://rpc-2"], 2);

        let result: Result<u64, _> = reader
            .read(|endpoint| async move {
                Err(ProviderError::Transport {
                    endpoint,
                    message: "timeout".into(),
                })
            })
            .await;

        match result {
            Err(ProviderError::Exhausted(msg)) => {
                assert!(msg.contains("rpc-1"));
                assert!(msg.contains("rpc-2"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_pool_fails_closed() {
        let reader = reader(&[], 2);
        let result: Result<u64, _> = reader.read(|_| async { Ok(1) }).await;
        assert!(matches!(result, Err(ProviderError::Exhausted(_))));
    }
}
