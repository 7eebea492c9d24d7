//! Retry logic for API and RPC operations.
//!
//! This module provides utilities for retrying failed operations with exponential backoff,
//! handling transient network errors, and managing retry attempts.

use crate::config::ClientConfig;
use crate::error::{Result, RetryContext, TezoroError};
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry strategy configuration
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Maximum number of retries
    pub max_retries: usize,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl RetryStrategy {
    /// Create a new retry strategy from client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            multiplier: config.retry_multiplier,
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Check if an error is retryable
    pub fn is_retryable(error: &TezoroError) -> bool {
        match error {
            TezoroError::NetworkError(_) => true,
            TezoroError::RateLimitExceeded(_) => true,
            // 5xx from the backend
            TezoroError::Api { status, .. } => *status >= 500,
            // HTTP-level failures of the RPC endpoint, not JSON-RPC errors
            TezoroError::RpcError(msg) => msg.starts_with("HTTP 5"),
            TezoroError::TransactionNotFound(_) => true,
            TezoroError::InvalidResponse(_) => true,
            _ => false,
        }
    }

    /// Only throttling is retried for requests that mutate backend state.
    pub fn is_retryable_mutation(error: &TezoroError) -> bool {
        matches!(error, TezoroError::RateLimitExceeded(_))
    }

    /// Execute a function with retry logic
    pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry_with_predicate(operation, Self::is_retryable)
            .await
    }

    /// Execute a function with retry logic and custom retry predicate
    pub async fn retry_with_predicate<F, Fut, T, P>(
        &self,
        operation: F,
        should_retry: P,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&TezoroError) -> bool,
    {
        let mut backoff = self.create_backoff();
        let mut retry_ctx = RetryContext::new();
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!("Attempt {} of {}", attempts, self.max_retries + 1);

            match operation().await {
                Ok(result) => {
                    if attempts > 1 {
                        debug!(
                            "Operation succeeded after {} attempts ({} ms in backoff)",
                            attempts, retry_ctx.total_time_ms
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !should_retry(&error) {
                        warn!("Non-retryable error: {:?}", error);
                        return Err(error);
                    }

                    if attempts > self.max_retries {
                        warn!(
                            "Max retries ({}) exceeded. Last error: {:?}",
                            self.max_retries, error
                        );
                        return Err(TezoroError::MaxRetriesExceeded(self.max_retries));
                    }

                    let delay = match &error {
                        TezoroError::RateLimitExceeded(secs) if *secs > 0 => {
                            Duration::from_secs(*secs).min(self.max_delay)
                        }
                        _ => match backoff.next_backoff() {
                            Some(d) => d,
                            None => {
                                warn!("Backoff exhausted");
                                return Err(TezoroError::MaxRetriesExceeded(self.max_retries));
                            }
                        },
                    };

                    retry_ctx.record_attempt(&error.to_string(), delay.as_millis() as u64);

                    warn!(
                        "Attempt {} failed: {:?}. Retrying in {:?}",
                        attempts, error, delay
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
