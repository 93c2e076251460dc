//! Submission rate limiting
//!
//! The orchestrator is handed a `RateLimitStrategy` rather than reaching for a global
//! limiter, so deployments and tests pick the policy explicitly.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Denied { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

#[async_trait]
pub trait RateLimitStrategy: Send + Sync {
    /// Consume one unit for `key` if available
    async fn check(&self, key: &str) -> RateLimitDecision;
}

/// Allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRateLimit;

#[async_trait]
impl RateLimitStrategy for NoRateLimit {
    async fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_next_token(&self) -> Duration {
        if self.tokens >= 1.0 || self.refill_rate <= 0.0 {
            return Duration::ZERO;
        }
        let seconds = (1.0 - self.tokens) / self.refill_rate;
        Duration::from_secs_f64(seconds.max(0.0))
    }

    fn is_full(&self) -> bool {
        self.tokens >= self.capacity
    }
}

/// Token bucket per key, sharded to keep lock contention low
#[derive(Clone)]
pub struct TokenBucketLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, TokenBucket>>>>,
    capacity: f64,
    refill_rate: f64,
    max_keys_per_shard: usize,
}

impl TokenBucketLimiter {
    const SHARD_COUNT: usize = 16;

    /// `capacity` requests at once, refilling at `refill_per_second`
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        let shards = (0..Self::SHARD_COUNT)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            capacity: f64::from(capacity.max(1)),
            refill_rate: refill_per_second,
            max_keys_per_shard: 10_000,
        }
    }

    /// `limit` requests per rolling hour
    pub fn per_hour(limit: u32) -> Self {
        Self::new(limit, f64::from(limit) / 3600.0)
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }
}

#[async_trait]
impl RateLimitStrategy for TokenBucketLimiter {
    async fn check(&self, key: &str) -> RateLimitDecision {
        let shard = &self.shards[self.shard_index(key)];
        let mut buckets = shard.lock().await;

        if buckets.len() >= self.max_keys_per_shard && !buckets.contains_key(key) {
            // Full buckets carry no state worth keeping
            buckets.retain(|_, bucket| {
                bucket.refill();
                !bucket.is_full()
            });
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_rate));

        if bucket.try_acquire() {
            tracing::trace!(key, tokens_remaining = bucket.tokens, "Rate limit token acquired");
            RateLimitDecision::Allowed
        } else {
            let retry_after = bucket.time_until_next_token();
            tracing::debug!(key, retry_after_ms = retry_after.as_millis() as u64, "Rate limit reached");
            RateLimitDecision::Denied { retry_after }
        }
    }
}
