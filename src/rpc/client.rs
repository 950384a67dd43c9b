use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{BlockNumber, Bytes};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Block, BlockId, BlockNumberOrTag, Filter, Log, TransactionRequest};
use governor::clock::{QuantaClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl RpcError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            RpcError::RateLimitExceeded => true,
            RpcError::InvalidUrl(_) => false,
            RpcError::ProviderError(msg) => Self::is_retryable_message(msg),
        }
    }

    fn is_retryable_message(msg: &str) -> bool {
        let msg_lower = msg.to_lowercase();
        msg_lower.contains("connection")
            || msg_lower.contains("timeout")
            || msg_lower.contains("timed out")
            || msg_lower.contains("reset")
            || msg_lower.contains("broken pipe")
            || msg_lower.contains("network")
            || msg_lower.contains("eof")
            || msg_lower.contains("sending request")
            || msg_lower.contains("rate limit")
            || msg_lower.contains("too many requests")
            || msg_lower.contains("429")
            || msg_lower.contains("502")
            || msg_lower.contains("503")
            || msg_lower.contains("504")
            || msg_lower.contains("internal server error")
            || msg_lower.contains("service unavailable")
            || msg_lower.contains("bad gateway")
            || msg_lower.contains("temporarily")
            || msg_lower.contains("try again")
            || msg_lower.contains("retry")
    }
}

/// Retry and backoff settings for RPC calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap applied to the computed backoff delay.
    pub max_delay: Duration,
    /// Backoff growth factor per retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Backoff delay before the given attempt; attempt 0 runs immediately.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let delay = Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Run an RPC operation, retrying transient failures with backoff.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt);
            tracing::warn!(
                "RPC retry {}/{} for '{}' in {:?}",
                attempt,
                config.max_retries,
                operation_name,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        "RPC '{}' succeeded after {} retries",
                        operation_name,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if e.is_retryable() && attempt < config.max_retries {
                    tracing::warn!(
                        "RPC '{}' failed (attempt {}/{}): {}",
                        operation_name,
                        attempt + 1,
                        config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                } else {
                    if attempt > 0 {
                        tracing::error!(
                            "RPC '{}' failed after {} attempts: {}",
                            operation_name,
                            attempt + 1,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| RpcError::ProviderError("Unknown error".to_string())))
}

pub type StandardRateLimiter =
    RateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub url: Url,
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
            jitter_min_ms: 5,
            jitter_max_ms: 50,
        }
    }
}

impl RpcClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            rate_limit: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }
}

pub struct RpcClient {
    provider: RootProvider<Ethereum>,
    config: RpcClientConfig,
    rate_limiter: Option<Arc<StandardRateLimiter>>,
    jitter: Option<Jitter>,
}

impl RpcClient {
    pub fn new(config: RpcClientConfig) -> Result<Self, RpcError> {
        let provider = RootProvider::<Ethereum>::new_http(config.url.clone());

        let (rate_limiter, jitter) = if let Some(ref rate_config) = config.rate_limit {
            let quota = Quota::per_second(rate_config.requests_per_second);
            let limiter = RateLimiter::direct(quota);
            let jitter = Jitter::new(
                Duration::from_millis(rate_config.jitter_min_ms),
                Duration::from_millis(rate_config.jitter_max_ms),
            );
            (Some(Arc::new(limiter)), Some(jitter))
        } else {
            (None, None)
        };

        Ok(Self {
            provider,
            config,
            rate_limiter,
            jitter,
        })
    }

    pub fn from_url(url: &str) -> Result<Self, RpcError> {
        let url = Url::parse(url).map_err(|e| RpcError::InvalidUrl(e.to_string()))?;
        Self::new(RpcClientConfig::new(url))
    }

    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    async fn wait_for_rate_limit(&self) {
        if let (Some(limiter), Some(jitter)) = (&self.rate_limiter, &self.jitter) {
            limiter.until_ready_with_jitter(*jitter).await;
        }
    }

    pub async fn get_block_number(&self) -> Result<BlockNumber, RpcError> {
        with_retry(&self.config.retry, "get_block_number", || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_block_number()
                .await
                .map_err(|e| RpcError::ProviderError(e.to_string()))
        })
        .await
    }

    pub async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Option<Block>, RpcError> {
        let op_name = format!("eth_getBlockByNumber({:?})", number);
        with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_block(BlockId::Number(number))
                .await
                .map_err(|e| RpcError::ProviderError(e.to_string()))
        })
        .await
    }

    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, RpcError> {
        let filter = filter.clone();
        let op_name = format!(
            "eth_getLogs(blocks {:?}-{:?})",
            filter.get_from_block(),
            filter.get_to_block()
        );
        with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_logs(&filter)
                .await
                .map_err(|e| RpcError::ProviderError(e.to_string()))
        })
        .await
    }

    pub async fn call(
        &self,
        tx: &TransactionRequest,
        block: Option<BlockId>,
    ) -> Result<Bytes, RpcError> {
        let tx = tx.clone();
        let op_name = format!("eth_call(to={:?}, block={:?})", tx.to, block);
        with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .call(tx.clone())
                .block(block.unwrap_or(BlockId::latest()))
                .await
                .map_err(|e| RpcError::ProviderError(e.to_string()))
        })
        .await
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}
