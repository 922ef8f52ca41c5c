//! Handle rate limiting headers.
//!
//! Chat webhook services announce their limits through a family of
//! `X-RateLimit-*` headers plus the standard `Retry-After`. None of these are
//! standardised yet, but there is an
//! [IETF draft](https://datatracker.ietf.org/doc/draft-ietf-httpapi-ratelimit-headers/).

use http::{HeaderMap, HeaderValue};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RetryAfterParseError {
    #[error("Unable to parse value '{0}'")]
    ValueError(String),

    #[error("Header value contains invalid chars")]
    HeaderValueError,
}

/// The rate limit information carried by a single response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RateLimitHeaders {
    /// Calls still permitted in the current window
    pub(crate) remaining: Option<u64>,
    /// Wall-clock time at which the current window resets
    pub(crate) reset: Option<SystemTime>,
    /// Time from now until the current window resets
    pub(crate) reset_after: Option<Duration>,
    /// Minimum delay before the next call, usually sent along with a 429
    pub(crate) retry_after: Option<Duration>,
    /// Whether the lockout applies to every endpoint, not just this one
    pub(crate) global: bool,
}

impl RateLimitHeaders {
    /// Extract all known rate limit fields from `headers`.
    /// Malformed values are treated as absent.
    pub(crate) fn parse(headers: &HeaderMap) -> Self {
        let retry_after = headers
            .get(http::header::RETRY_AFTER)
            .and_then(|value| parse_retry_after(value).ok());

        let reset = parse_header_value::<f64>(headers, &["x-ratelimit-reset", "x-rate-limit-reset"])
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .and_then(|since_epoch| UNIX_EPOCH.checked_add(since_epoch));

        let reset_after = headers
            .get("x-ratelimit-reset-after")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_delay_seconds);

        let global = header_is(headers, "x-ratelimit-global", "true")
            || header_is(headers, "x-ratelimit-scope", "global");

        Self {
            remaining: parse_header_value(
                headers,
                &[
                    "x-ratelimit-remaining",
                    "x-rate-limit-remaining",
                    "ratelimit-remaining",
                ],
            ),
            reset,
            reset_after,
            retry_after,
            global,
        }
    }

    /// Whether the quota of the current window is used up
    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// The earliest instant at which a new call may be attempted, i.e. the
    /// latest of all announced deadlines. `None` if no timing header was sent.
    pub(crate) fn unlock_at(&self, now: Instant) -> Option<Instant> {
        let reset = self.reset.map(|reset| {
            reset
                .duration_since(SystemTime::now())
                // if the reset lies in the past, the window is open already
                .map_or(now, |remaining| deadline(now, remaining))
        });
        let reset_after = self.reset_after.map(|delay| deadline(now, delay));
        let retry_after = self.retry_after.map(|delay| deadline(now, delay));

        [reset, reset_after, retry_after].into_iter().flatten().max()
    }
}

/// Deadlines further out than this are clamped to it. No retry budget
/// reaches that far, so the message gives up instead of waiting.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, clamped to [`FAR_FUTURE`]
fn deadline(now: Instant, delay: Duration) -> Instant {
    now + delay.min(FAR_FUTURE)
}

/// Parse a delay given in seconds, e.g. `2` or `0.25`.
/// Only digits with an optional fractional part are accepted.
fn parse_delay_seconds(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Parse the "Retry-After" header as specified per
/// [RFC 7231 section 7.1.3](https://www.rfc-editor.org/rfc/rfc7231#section-7.1.3).
///
/// Webhook services commonly send fractional seconds, which are accepted too.
pub(crate) fn parse_retry_after(value: &HeaderValue) -> Result<Duration, RetryAfterParseError> {
    let value = value
        .to_str()
        .map_err(|_| RetryAfterParseError::HeaderValueError)?;

    // RFC 7231: Retry-After = HTTP-date / delay-seconds
    parse_delay_seconds(value).map_or_else(
        || {
            httpdate::parse_http_date(value)
                .map(|s| {
                    s.duration_since(SystemTime::now())
                        // if date is in the past, we can use ZERO
                        .unwrap_or(Duration::ZERO)
                })
                .map_err(|_| RetryAfterParseError::ValueError(value.into()))
        },
        Ok,
    )
}

/// Helper method to parse numeric header values from common rate limit headers
fn parse_header_value<T: std::str::FromStr>(headers: &HeaderMap, header_names: &[&str]) -> Option<T> {
    for header_name in header_names {
        if let Some(value) = headers.get(*header_name)
            && let Ok(value_str) = value.to_str()
            && let Ok(number) = value_str.trim().parse::<T>()
        {
            return Some(number);
        }
    }
    None
}

fn header_is(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
}
