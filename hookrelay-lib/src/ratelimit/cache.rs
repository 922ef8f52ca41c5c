use dashmap::DashMap;
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use tokio::time::Instant;

use super::config::DEFAULT_FALLBACK_WAIT;
use super::headers::RateLimitHeaders;
use crate::Endpoint;

/// Namespace of a lockout entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockoutKey {
    /// Applies to every endpoint at once
    Global,
    /// Applies to a single endpoint
    Endpoint(Endpoint),
}

/// Remembers, per endpoint and globally, the earliest instant at which a new
/// call may be attempted.
///
/// An absent entry means "not locked". Entries are only ever replaced as a
/// whole (last writer wins); the global entry dominates through `max`.
#[derive(Debug)]
pub struct RateLimitCache {
    lockouts: DashMap<LockoutKey, Instant>,
    fallback_wait: Duration,
}

impl Default for RateLimitCache {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_WAIT)
    }
}

impl RateLimitCache {
    /// Create an empty cache.
    ///
    /// `fallback_wait` is the lockout applied after a 429 whose headers name
    /// no deadline at all.
    #[must_use]
    pub fn new(fallback_wait: Duration) -> Self {
        Self {
            lockouts: DashMap::new(),
            fallback_wait,
        }
    }

    /// Whether calls to `endpoint` must currently be held back, either by its
    /// own lockout or by the global one
    #[must_use]
    pub fn is_locked(&self, endpoint: &Endpoint) -> bool {
        self.next_unlock(endpoint)
            .is_some_and(|unlock_at| unlock_at > Instant::now())
    }

    /// The later of the endpoint's own and the global unlock instant.
    /// `None` if neither is set.
    #[must_use]
    pub fn next_unlock(&self, endpoint: &Endpoint) -> Option<Instant> {
        let own = self.unlock_at(&LockoutKey::Endpoint(endpoint.clone()));
        let global = self.unlock_at(&LockoutKey::Global);
        own.max(global)
    }

    /// The unlock instant stored under `key`, if any
    #[must_use]
    pub fn unlock_at(&self, key: &LockoutKey) -> Option<Instant> {
        self.lockouts.get(key).map(|entry| *entry)
    }

    /// Update the cache from the answer to a call to `endpoint`.
    ///
    /// If the quota is used up or the call was rejected with a 429, the
    /// lockout is set to the latest deadline announced by the headers, under
    /// the global key if the response says the limit is global. Otherwise, and
    /// only if `confirm_clear` is set, the endpoint's own lockout is dropped:
    /// a fresh successful call proves it has expired.
    ///
    /// Returns the recorded unlock instant, if a lockout was recorded.
    pub fn record(
        &self,
        endpoint: &Endpoint,
        headers: &HeaderMap,
        status: StatusCode,
        confirm_clear: bool,
    ) -> Option<Instant> {
        let limits = RateLimitHeaders::parse(headers);
        let rejected = status == StatusCode::TOO_MANY_REQUESTS;

        if !rejected && !limits.is_exhausted() {
            if confirm_clear
                && self
                    .lockouts
                    .remove(&LockoutKey::Endpoint(endpoint.clone()))
                    .is_some()
            {
                log::debug!("Lockout of endpoint {endpoint} cleared");
            }
            return None;
        }

        let now = Instant::now();
        let unlock_at = match limits.unlock_at(now) {
            Some(unlock_at) => unlock_at,
            None if rejected => now + self.fallback_wait,
            None => return None,
        };

        let key = if limits.global {
            LockoutKey::Global
        } else {
            LockoutKey::Endpoint(endpoint.clone())
        };
        log::debug!(
            "Locking {} for {}ms (status {}, remaining {:?})",
            match key {
                LockoutKey::Global => String::from("all endpoints"),
                LockoutKey::Endpoint(ref endpoint) => format!("endpoint {endpoint}"),
            },
            unlock_at.saturating_duration_since(now).as_millis(),
            status.as_u16(),
            limits.remaining,
        );
        self.lockouts.insert(key, unlock_at);
        Some(unlock_at)
    }

    /// Forget all lockouts
    pub fn clear(&self) {
        self.lockouts.clear();
    }

    /// Number of stored lockout entries, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.lockouts.len()
    }

    /// Whether no lockout is stored at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lockouts.is_empty()
    }
}
