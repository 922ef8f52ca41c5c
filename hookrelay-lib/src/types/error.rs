use http::{HeaderMap, StatusCode};
use std::time::Duration;
use thiserror::Error;

use crate::Endpoint;

/// Possible errors when relaying messages with `hookrelay_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The endpoint rejected the message or could not be reached.
    /// Rate limit rejections are never reported this way; they are retried.
    #[error("Failed to deliver message: {0}")]
    Transport(#[from] TransportError),

    /// The endpoint kept rejecting the message with `429 Too Many Requests`
    /// until the retry budget ran out
    #[error(
        "Gave up on endpoint {endpoint} after {attempts} rate-limited attempts ({waited:?} spent waiting)"
    )]
    RateLimitExhausted {
        /// The endpoint that kept rate limiting
        endpoint: Endpoint,
        /// Number of attempts that were rejected with a 429
        attempts: u32,
        /// Total time spent waiting for lockouts to expire
        waited: Duration,
    },

    /// A destination has no webhook id or token configured
    #[error("Destination `{0}` is missing a webhook id or token")]
    MissingCredentials(String),

    /// The base URL cannot be extended with endpoint path segments
    #[error("Base URL `{0}` cannot carry endpoint path segments")]
    InvalidBaseUrl(String),

    /// The HTTP client could not be created
    #[error("Failed to build HTTP client")]
    BuildClient(#[source] reqwest::Error),

    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The worker serving an endpoint went away before it replied
    #[error("Dispatcher shut down before the message was delivered")]
    DispatcherClosed,

    /// The event payload could not be turned into messages
    #[error("Cannot format event payload: {0}")]
    Format(String),
}

impl ErrorKind {
    /// Return the HTTP status code of the failed delivery, if the endpoint
    /// answered at all
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(e) => e.status(),
            Self::RateLimitExhausted { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            _ => None,
        }
    }
}

/// A normalized failure of a single network call.
///
/// Every non-2xx answer is reported as [`TransportError::Status`], including
/// `429 Too Many Requests`. The transport layer does not special-case rate
/// limits; that is the scheduler's job.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The endpoint answered with a non-success status code
    #[error("Endpoint responded with {status}")]
    Status {
        /// Response status code
        status: StatusCode,
        /// Response headers, including any rate limit headers
        headers: HeaderMap,
        /// Response body, usually a JSON error description
        body: String,
    },

    /// The request never produced a response
    #[error("Network error while sending request")]
    Network(#[from] reqwest::Error),
}

impl TransportError {
    /// Status code of the response, if there was one
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status(),
        }
    }

    /// Headers of the response, if there was one
    #[must_use]
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Self::Status { headers, .. } => Some(headers),
            Self::Network(_) => None,
        }
    }

    /// Whether the endpoint rejected the call with `429 Too Many Requests`
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}
