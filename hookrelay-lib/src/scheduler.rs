use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use tokio::time::{Instant, sleep_until};
use url::Url;

use crate::ratelimit::{RateLimitCache, RateLimitConfig};
use crate::transport::{OutboundRequest, Transport};
use crate::{DispatchRequest, DispatchResponse, ErrorKind, Result};

/// Drives a single message through lockout waits and rate limit retries.
///
/// Each attempt first waits for the later of the endpoint's own and the
/// global lockout, then calls the transport. A `429 Too Many Requests`
/// records the announced lockout and starts over with the identical request;
/// any other outcome is final.
#[derive(Debug, Clone)]
pub(crate) struct Scheduler {
    base_url: Url,
    transport: Arc<dyn Transport>,
    cache: Arc<RateLimitCache>,
    config: RateLimitConfig,
}

impl Scheduler {
    pub(crate) fn new(
        base_url: Url,
        transport: Arc<dyn Transport>,
        cache: Arc<RateLimitCache>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            base_url,
            transport,
            cache,
            config,
        }
    }

    pub(crate) fn cache(&self) -> &RateLimitCache {
        &self.cache
    }

    /// Deliver `request`, waiting out and retrying rate limits.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RateLimitExhausted`] once more than
    /// `max_retries` attempts were rejected with a 429 or the next wait would
    /// exceed `max_wait`, and [`ErrorKind::Transport`] for any other failure.
    pub(crate) async fn run(&self, request: &DispatchRequest) -> Result<DispatchResponse> {
        let endpoint = request.endpoint();
        let outbound = OutboundRequest {
            url: endpoint.url(&self.base_url, request.variant())?,
            method: Method::POST,
            headers: request.headers().clone(),
            query: request.query().to_vec(),
            body: request.body().to_string(),
        };

        let mut rejected = 0;
        let mut waited = Duration::ZERO;
        loop {
            let now = Instant::now();
            if let Some(unlock_at) = self.cache.next_unlock(endpoint)
                && unlock_at > now
            {
                let wait = unlock_at - now;
                if waited.saturating_add(wait) > self.config.max_wait {
                    log::warn!(
                        "Giving up on {} for endpoint {endpoint}: waiting another {}ms would exceed {:?}",
                        request.name(),
                        wait.as_millis(),
                        self.config.max_wait,
                    );
                    return Err(ErrorKind::RateLimitExhausted {
                        endpoint: endpoint.clone(),
                        attempts: rejected,
                        waited,
                    });
                }
                log::debug!(
                    "Endpoint {endpoint} is locked, delaying {} by {}ms",
                    request.name(),
                    wait.as_millis()
                );
                sleep_until(unlock_at).await;
                waited += wait;
            }

            match self.transport.send(&outbound).await {
                Ok(response) => {
                    self.cache
                        .record(endpoint, response.headers(), response.status(), true);
                    log::debug!("Delivered {} to endpoint {endpoint}: {response}", request.name());
                    return Ok(response);
                }
                Err(e) if e.is_rate_limited() => {
                    rejected += 1;
                    let empty = HeaderMap::new();
                    self.cache.record(
                        endpoint,
                        e.headers().unwrap_or(&empty),
                        StatusCode::TOO_MANY_REQUESTS,
                        false,
                    );
                    if rejected > self.config.max_retries {
                        log::warn!(
                            "Giving up on {} for endpoint {endpoint} after {rejected} rate-limited attempts",
                            request.name()
                        );
                        return Err(ErrorKind::RateLimitExhausted {
                            endpoint: endpoint.clone(),
                            attempts: rejected,
                            waited,
                        });
                    }
                    log::warn!(
                        "Endpoint {endpoint} rate limited {} (attempt {rejected}), rescheduling",
                        request.name()
                    );
                }
                Err(e) => {
                    if let (Some(status), Some(headers)) = (e.status(), e.headers()) {
                        self.cache.record(endpoint, headers, status, false);
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, Reply, message, mock_base_url};
    use pretty_assertions::assert_eq;

    fn scheduler(transport: &MockTransport, config: RateLimitConfig) -> Scheduler {
        Scheduler::new(
            mock_base_url(),
            Arc::new(transport.clone()),
            Arc::new(RateLimitCache::new(config.fallback_wait)),
            config,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_endpoint_is_called_immediately() {
        let transport = MockTransport::new();
        let scheduler = scheduler(&transport, RateLimitConfig::default());
        let start = Instant::now();

        let response = scheduler.run(&message("1", "a")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.calls()[0].at, start);
        assert_eq!(
            transport.calls()[0].request.url.as_str(),
            "http://relay.test/1/token"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_attempt_is_retried_after_retry_after() {
        let transport = MockTransport::new();
        transport.script("1", [Reply::status(429).header("retry-after", "2")]);
        let scheduler = scheduler(&transport, RateLimitConfig::default());
        let start = Instant::now();

        let response = scheduler.run(&message("1", "a")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].at - start, Duration::from_secs(2));
        assert_eq!(calls[0].request, calls[1].request);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bare_rate_limit_waits_fallback() {
        let transport = MockTransport::new();
        transport.script("1", [Reply::status(429)]);
        let config = RateLimitConfig {
            fallback_wait: Duration::from_millis(300),
            ..RateLimitConfig::default()
        };
        let scheduler = scheduler(&transport, config);
        let start = Instant::now();

        scheduler.run(&message("1", "a")).await.unwrap();

        assert_eq!(transport.calls()[1].at - start, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget() {
        let transport = MockTransport::new();
        transport.script(
            "1",
            std::iter::repeat_n(Reply::status(429).header("retry-after", "1"), 3),
        );
        let config = RateLimitConfig {
            max_retries: 2,
            ..RateLimitConfig::default()
        };
        let scheduler = scheduler(&transport, config);

        let error = scheduler.run(&message("1", "a")).await.unwrap_err();

        assert!(matches!(
            error,
            ErrorKind::RateLimitExhausted { attempts: 3, waited, .. } if waited == Duration::from_secs(2)
        ));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_budget() {
        let transport = MockTransport::new();
        transport.script("1", [Reply::status(429).header("retry-after", "60")]);
        let config = RateLimitConfig {
            max_wait: Duration::from_secs(30),
            ..RateLimitConfig::default()
        };
        let scheduler = scheduler(&transport, config);
        let start = Instant::now();

        let error = scheduler.run(&message("1", "a")).await.unwrap_err();

        assert!(matches!(
            error,
            ErrorKind::RateLimitExhausted { attempts: 1, waited: Duration::ZERO, .. }
        ));
        // the lockout is remembered for later messages
        assert_eq!(
            scheduler.cache().next_unlock(&crate::Endpoint::new("1", "token")),
            Some(start + Duration::from_secs(60))
        );
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_are_not_retried() {
        let transport = MockTransport::new();
        transport.script("1", [Reply::status(503).header("retry-after", "1")]);
        let scheduler = scheduler(&transport, RateLimitConfig::default());

        let error = scheduler.run(&message("1", "a")).await.unwrap_err();

        assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_own_lockout() {
        let transport = MockTransport::new();
        transport.script(
            "1",
            [Reply::status(200)
                .header("x-ratelimit-remaining", "0")
                .header("x-ratelimit-reset-after", "1")],
        );
        let scheduler = scheduler(&transport, RateLimitConfig::default());
        let endpoint = crate::Endpoint::new("1", "token");

        scheduler.run(&message("1", "a")).await.unwrap();
        assert!(scheduler.cache().is_locked(&endpoint));

        scheduler.run(&message("1", "b")).await.unwrap();
        assert_eq!(scheduler.cache().next_unlock(&endpoint), None);
    }
}
