//! Entry point for delivering webhook messages.
//!
//! This module defines two structs, [`Dispatcher`] and [`DispatcherBuilder`].
//! `Dispatcher` accepts messages and delivers them in order per endpoint,
//! honoring the endpoints' rate limits. `DispatcherBuilder` configures the
//! HTTP client used to do so.
#![allow(clippy::module_name_repetitions)]
use http::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header;
use tokio::time::Instant;
use typed_builder::TypedBuilder;
use url::Url;

use crate::queue::{Delivery, EndpointQueue};
use crate::ratelimit::{RateLimitCache, RateLimitConfig};
use crate::scheduler::Scheduler;
use crate::transport::{ReqwestTransport, Transport};
use crate::{DispatchRequest, DispatchResponse, Endpoint, ErrorKind, Result};

/// Default base URL of webhook endpoints
pub const DEFAULT_BASE_URL: &str = "https://discord.com/api/webhooks";
/// Default user agent, `hookrelay/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("hookrelay/", env!("CARGO_PKG_VERSION"));

// Constants currently not configurable by the user.
/// A timeout for only the connect phase of the HTTP client.
const CONNECT_TIMEOUT: u64 = 10;
/// TCP keepalive
/// See <https://tldp.org/HOWTO/TCP-Keepalive-HOWTO/overview.html> for more info
const TCP_KEEPALIVE: u64 = 60;

/// Builder for [`Dispatcher`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `DispatcherBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `DispatcherBuilder`.
"))]
pub struct DispatcherBuilder {
    /// URL below which endpoint paths (`{id}/{token}[/{variant}]`) are
    /// appended
    #[builder(default_code = "default_base_url()")]
    base_url: Url,

    /// User-agent sent with every message.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Sets the default [headers] for every request. See also [here].
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    /// [here]: https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#method.default_headers
    custom_headers: HeaderMap,

    /// Response timeout per attempt.
    ///
    /// Without a timeout, a hanging endpoint holds back its queue forever.
    timeout: Option<Duration>,

    /// Bounds on rate limit waits and retries
    rate_limit: RateLimitConfig,
}

impl Default for DispatcherBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("Default base URL is valid")
}

impl DispatcherBuilder {
    /// Instantiates a [`Dispatcher`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent contains characters not allowed in a header.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn dispatcher(self) -> Result<Dispatcher> {
        let Self {
            base_url,
            user_agent,
            custom_headers: mut headers,
            timeout,
            rate_limit,
        } = self;

        headers.insert(header::USER_AGENT, HeaderValue::from_str(&user_agent)?);

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .tcp_keepalive(Duration::from_secs(TCP_KEEPALIVE));

        let client = (match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        })
        .build()
        .map_err(ErrorKind::BuildClient)?;

        Ok(Dispatcher::with_transport(
            base_url,
            ReqwestTransport::new(client),
            rate_limit,
        ))
    }
}

/// Delivers messages to webhook endpoints.
///
/// Messages to the same endpoint are delivered one after the other, in the
/// order they were enqueued. Messages to different endpoints don't wait for
/// each other, unless the service announced a global rate limit.
///
/// Cloning is cheap; all clones share their queues and rate limit state.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    queue: EndpointQueue,
}

impl Dispatcher {
    /// Create a dispatcher delivering through an arbitrary [`Transport`]
    #[must_use]
    pub fn with_transport<T: Transport + 'static>(
        base_url: Url,
        transport: T,
        config: RateLimitConfig,
    ) -> Self {
        let cache = Arc::new(RateLimitCache::new(config.fallback_wait));
        let scheduler = Scheduler::new(base_url, Arc::new(transport), cache, config);
        Self {
            queue: EndpointQueue::new(scheduler),
        }
    }

    /// Queue `request` for delivery and return a handle to its outcome.
    ///
    /// The message is placed in its endpoint's queue right away, so messages
    /// are delivered in the order of `enqueue` calls, whether or not the
    /// returned [`Delivery`] is ever awaited.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn enqueue(&self, request: DispatchRequest) -> Delivery {
        log::debug!(
            "Queueing {} for endpoint {}",
            request.name(),
            request.endpoint()
        );
        self.queue.enqueue(request)
    }

    /// Deliver `request` and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RateLimitExhausted`] if the endpoint kept rate
    /// limiting beyond the configured budget, or [`ErrorKind::Transport`] if
    /// it rejected the message otherwise or could not be reached.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchResponse> {
        self.enqueue(request).await
    }

    /// Whether messages to `endpoint` are currently held back
    #[must_use]
    pub fn is_locked(&self, endpoint: &Endpoint) -> bool {
        self.queue.scheduler().cache().is_locked(endpoint)
    }

    /// When messages to `endpoint` may be sent again, if they are held back
    /// by an endpoint-specific or global lockout
    #[must_use]
    pub fn next_unlock(&self, endpoint: &Endpoint) -> Option<Instant> {
        self.queue.scheduler().cache().next_unlock(endpoint)
    }

    /// Number of endpoints that currently have outstanding messages
    #[must_use]
    pub fn pending_endpoints(&self) -> usize {
        self.queue.pending_endpoints()
    }
}
