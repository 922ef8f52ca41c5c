use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of times a message is retried after a `429 Too Many Requests`
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default upper bound on the total time a message spends waiting for lockouts
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Default lockout after a `429 Too Many Requests` that names no deadline
pub const DEFAULT_FALLBACK_WAIT: Duration = Duration::from_secs(1);

/// Bounds on how long a single message may be held back by rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum number of retries after the endpoint answered with a 429.
    /// Once exceeded, the message fails with
    /// [`ErrorKind::RateLimitExhausted`](crate::ErrorKind::RateLimitExhausted).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum total time a single message may wait for lockouts to expire
    #[serde(default = "default_max_wait", with = "humantime_serde")]
    pub max_wait: Duration,

    /// Lockout applied after a 429 response without any timing header,
    /// so that retries never hammer the endpoint
    #[serde(default = "default_fallback_wait", with = "humantime_serde")]
    pub fallback_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_wait: default_max_wait(),
            fallback_wait: default_fallback_wait(),
        }
    }
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_max_wait() -> Duration {
    DEFAULT_MAX_WAIT
}

const fn default_fallback_wait() -> Duration {
    DEFAULT_FALLBACK_WAIT
}

impl RateLimitConfig {
    /// Create a `RateLimitConfig` from CLI options, using defaults for missing values
    #[must_use]
    pub fn from_options(max_retries: Option<u32>, max_wait: Option<Duration>) -> Self {
        Self {
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            max_wait: max_wait.unwrap_or(DEFAULT_MAX_WAIT),
            ..Self::default()
        }
    }
}
