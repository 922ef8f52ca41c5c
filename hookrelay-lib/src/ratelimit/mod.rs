//! Per-endpoint and global rate limit bookkeeping.
//!
//! Webhook services tell their callers how much of the current quota is left
//! and when it resets. This module turns that information into lockouts,
//! which the scheduler consults before every call.
//!
//! # Architecture
//!
//! - [`RateLimitCache`]: Remembers when each endpoint (or all of them) may be called again
//! - [`LockoutKey`]: Selects between an endpoint-specific and the global lockout
//! - [`RateLimitConfig`]: Bounds on how long a message may be held back

mod cache;
mod config;
pub(crate) mod headers;

pub use cache::{LockoutKey, RateLimitCache};
pub use config::{DEFAULT_FALLBACK_WAIT, DEFAULT_MAX_RETRIES, DEFAULT_MAX_WAIT, RateLimitConfig};
