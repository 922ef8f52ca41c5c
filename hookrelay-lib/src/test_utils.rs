use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::time::Instant;
use url::Url;

use crate::transport::{OutboundRequest, Transport};
use crate::{DispatchRequest, DispatchResponse, Endpoint, TransportError};

/// Base URL used together with [`MockTransport`]
pub(crate) const MOCK_BASE_URL: &str = "http://relay.test/";

/// One scripted answer of a [`MockTransport`]
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    delay: Duration,
}

impl Reply {
    pub(crate) fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("Expected valid status code"),
            headers: HeaderMap::new(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn header(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value.as_ref()).expect("Expected valid header value"),
        );
        self
    }

    /// Take `delay` to answer
    pub(crate) const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Start and end of each call, identified by the request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Start(String),
    End(String),
}

/// A call observed by a [`MockTransport`]
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub(crate) at: Instant,
    pub(crate) request: OutboundRequest,
}

#[derive(Debug, Default)]
struct Recorder {
    scripts: HashMap<String, VecDeque<Reply>>,
    events: Vec<Event>,
    calls: Vec<Call>,
}

/// An in-memory [`Transport`] answering from per-endpoint scripts.
///
/// Endpoints are told apart by the first path segment (the webhook id) of
/// URLs below [`MOCK_BASE_URL`]. Once a script runs dry, every call is
/// answered with `200 OK`.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    recorder: Arc<Mutex<Recorder>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue `replies` for the endpoint with the given webhook id
    pub(crate) fn script(&self, id: &str, replies: impl IntoIterator<Item = Reply>) {
        self.recorder
            .lock()
            .unwrap()
            .scripts
            .entry(id.to_string())
            .or_default()
            .extend(replies);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.recorder.lock().unwrap().events.clone()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.recorder.lock().unwrap().calls.clone()
    }

    /// Bodies of all calls, in call order
    pub(crate) fn bodies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.request.body)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<DispatchResponse, TransportError> {
        let id = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .unwrap_or_default()
            .to_string();

        let reply = {
            let mut recorder = self.recorder.lock().unwrap();
            recorder.events.push(Event::Start(request.body.clone()));
            recorder.calls.push(Call {
                at: Instant::now(),
                request: request.clone(),
            });
            recorder
                .scripts
                .get_mut(&id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Reply::status(200))
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.recorder
            .lock()
            .unwrap()
            .events
            .push(Event::End(request.body.clone()));

        if reply.status.is_success() {
            Ok(DispatchResponse::new(reply.status, reply.headers, String::new()))
        } else {
            Err(TransportError::Status {
                status: reply.status,
                headers: reply.headers,
                body: String::new(),
            })
        }
    }
}

pub(crate) fn mock_base_url() -> Url {
    Url::parse(MOCK_BASE_URL).expect("Expected valid base URL")
}

/// A message for the endpoint with webhook id `id`
pub(crate) fn message(id: &str, body: &str) -> DispatchRequest {
    DispatchRequest::builder()
        .endpoint(Endpoint::new(id, "token"))
        .body(body)
        .name(format!("message {body}"))
        .build()
}

/// Epoch seconds `delay` from now, as sent in `X-RateLimit-Reset`
pub(crate) fn reset_in(delay: Duration) -> String {
    let since_epoch = (std::time::SystemTime::now() + delay)
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap();
    format!("{:.3}", since_epoch.as_secs_f64())
}
