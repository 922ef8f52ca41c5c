//! The network boundary of the dispatcher.
//!
//! A [`Transport`] performs exactly one call and reports what happened. It
//! never retries and never looks at rate limit headers; every non-success
//! status, `429 Too Many Requests` included, comes back as a
//! [`TransportError::Status`].

use async_trait::async_trait;
use http::{HeaderMap, Method};
use reqwest::Client as ReqwestClient;
use std::fmt::Debug;
use url::Url;

use crate::{DispatchResponse, TransportError};

/// A single fully resolved call, as handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Full endpoint URL, without the query
    pub url: Url,
    /// HTTP method, `POST` for webhooks
    pub method: Method,
    /// Request headers, not including the transport's defaults
    pub headers: HeaderMap,
    /// Query pairs appended to `url`
    pub query: Vec<(String, String)>,
    /// Request body
    pub body: String,
}

/// Something that can deliver an [`OutboundRequest`]
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Perform the call.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Status`] for any non-2xx answer and
    /// [`TransportError::Network`] if no answer was received at all.
    async fn send(&self, request: &OutboundRequest) -> Result<DispatchResponse, TransportError>;
}

/// A [`Transport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Wrap an already configured client
    #[must_use]
    pub const fn new(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<DispatchResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .body(request.body.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if status.is_success() {
            Ok(DispatchResponse::new(status, headers, body))
        } else {
            Err(TransportError::Status {
                status,
                headers,
                body,
            })
        }
    }
}
