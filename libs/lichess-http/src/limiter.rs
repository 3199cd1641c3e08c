use crate::config::RateLimitConfig;
use crate::error::ClientError;
use arc_swap::ArcSwap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Bucket {
    limiter: DefaultDirectRateLimiter,
    limits: RateLimitConfig,
}

impl Bucket {
    fn new(limits: RateLimitConfig) -> Result<Self, ClientError> {
        let burst = NonZeroU32::new(limits.burst)
            .ok_or_else(|| ClientError::InvalidRateLimit("burst should be > 0".to_owned()))?;
        let quota = Quota::with_period(limits.interval)
            .ok_or_else(|| ClientError::InvalidRateLimit("interval should be > 0".to_owned()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: RateLimiter::direct(quota),
            limits,
        })
    }
}

/// Token bucket shared by every request issued through one executor.
///
/// Limits can be replaced at any time with [`RateGovernor::set_limits`]. The
/// swap is atomic: callers already waiting keep waiting on the bucket they
/// started with, new callers see the new one.
pub struct RateGovernor {
    active: ArcSwap<Bucket>,
}

impl RateGovernor {
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRateLimit`] if `burst` or `interval` is zero.
    pub fn new(limits: RateLimitConfig) -> Result<Self, ClientError> {
        Ok(Self {
            active: ArcSwap::from_pointee(Bucket::new(limits)?),
        })
    }

    /// Replace the bucket with one refilling a token every `interval`, holding up to `burst`.
    ///
    /// The new bucket starts full. On error the previous limits stay in force.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRateLimit`] if `burst` or `interval` is zero.
    pub fn set_limits(&self, interval: Duration, burst: u32) -> Result<(), ClientError> {
        let bucket = Bucket::new(RateLimitConfig::new(interval, burst))?;
        self.active.store(Arc::new(bucket));
        tracing::debug!(?interval, burst, "rate limits replaced");
        Ok(())
    }

    /// Limits currently in force.
    #[must_use]
    pub fn limits(&self) -> RateLimitConfig {
        self.active.load().limits
    }

    /// Wait for one token, or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Canceled`] if the token is cancelled first. No
    /// permit is consumed in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        let bucket = self.active.load_full();

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("cancelled while waiting for rate limiter");
                Err(ClientError::Canceled)
            }
            () = bucket.limiter.until_ready() => Ok(()),
        }
    }
}

impl std::fmt::Debug for RateGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGovernor")
            .field("limits", &self.limits())
            .finish()
    }
}
