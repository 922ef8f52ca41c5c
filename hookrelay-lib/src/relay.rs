//! Fan-out of one inbound event to every configured destination.
//!
//! Turning an event into message bodies is the job of a [`MessageFormatter`].
//! [`relay`] then queues every body for every [`Destination`] and reports
//! what happened. A failing destination never keeps the others from being
//! served.

use std::fmt;

use futures::future::join_all;
use http::HeaderMap;
use serde::Deserialize;

use crate::{DispatchRequest, Dispatcher, Endpoint, ErrorKind, Result};

/// A configured webhook to relay events to
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Destination {
    /// Name used in logs and reports
    pub name: String,
    /// Webhook id
    #[serde(default)]
    pub id: String,
    /// Webhook token
    #[serde(default)]
    pub token: String,
    /// Optional endpoint flavor, appended to the webhook URL
    #[serde(default)]
    pub variant: Option<String>,
}

impl Destination {
    /// The endpoint this destination delivers to.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MissingCredentials`] if the id or the token is empty.
    pub fn endpoint(&self) -> Result<Endpoint> {
        if self.id.trim().is_empty() || self.token.trim().is_empty() {
            return Err(ErrorKind::MissingCredentials(self.name.clone()));
        }
        Ok(Endpoint::new(self.id.trim(), self.token.trim()))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("variant", &self.variant)
            .finish()
    }
}

/// Turns an inbound event into the bodies of outbound messages
pub trait MessageFormatter: Send + Sync {
    /// Format `event`. Every returned body becomes one message per destination.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Format`] if the event cannot be represented.
    fn format(&self, event: &str) -> Result<Vec<String>>;
}

/// Relays events unchanged, for endpoints that understand the inbound format
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl MessageFormatter for PassThrough {
    fn format(&self, event: &str) -> Result<Vec<String>> {
        if event.trim().is_empty() {
            return Err(ErrorKind::Format("event payload is empty".into()));
        }
        Ok(vec![event.to_string()])
    }
}

/// What happened to the messages of one [`relay`] call
#[derive(Debug, Default)]
pub struct RelaySummary {
    /// Number of messages delivered
    pub delivered: usize,
    /// Failed messages by destination name
    pub failed: Vec<(String, ErrorKind)>,
}

impl RelaySummary {
    /// Whether every message was delivered
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deliver every body in `bodies` to every destination, sending `headers`
/// with each message.
///
/// All messages are queued before any of them is awaited. Failures are
/// logged and collected; they never abort the remaining deliveries.
pub async fn relay(
    dispatcher: &Dispatcher,
    destinations: &[Destination],
    bodies: &[String],
    headers: &HeaderMap,
) -> RelaySummary {
    let mut summary = RelaySummary::default();

    let mut names = Vec::new();
    let mut deliveries = Vec::new();
    for destination in destinations {
        let endpoint = match destination.endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                log::error!("Skipping destination `{}`: {e}", destination.name);
                summary.failed.push((destination.name.clone(), e));
                continue;
            }
        };

        for (index, body) in bodies.iter().enumerate() {
            let request = DispatchRequest::builder()
                .endpoint(endpoint.clone())
                .variant(destination.variant.clone())
                .headers(headers.clone())
                .body(body.clone())
                .name(format!(
                    "message {}/{} for `{}`",
                    index + 1,
                    bodies.len(),
                    destination.name
                ))
                .build();
            names.push(destination.name.clone());
            deliveries.push(dispatcher.enqueue(request));
        }
    }

    for (name, outcome) in names.into_iter().zip(join_all(deliveries).await) {
        match outcome {
            Ok(response) => {
                log::info!("Delivered message to `{name}` {response}");
                summary.delivered += 1;
            }
            Err(e) => {
                log::error!("Failed to deliver message to `{name}`: {e}");
                summary.failed.push((name, e));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RateLimitConfig;
    use crate::test_utils::{MockTransport, Reply, mock_base_url};
    use pretty_assertions::assert_eq;

    fn destination(name: &str, id: &str, token: &str) -> Destination {
        Destination {
            name: name.into(),
            id: id.into(),
            token: token.into(),
            variant: None,
        }
    }

    #[test]
    fn test_destination_from_toml() {
        let destination: Destination = toml::from_str(
            r#"
            name = "ci"
            id = "1234"
            token = "s3cr3t"
            variant = "github"
            "#,
        )
        .unwrap();

        assert_eq!(destination.variant.as_deref(), Some("github"));
        assert_eq!(destination.endpoint().unwrap(), Endpoint::new("1234", "s3cr3t"));
        assert!(!format!("{destination:?}").contains("s3cr3t"));
    }

    #[test]
    fn test_missing_credentials() {
        for destination in [
            destination("no-id", "", "t"),
            destination("no-token", "1", " "),
        ] {
            assert!(matches!(
                destination.endpoint(),
                Err(ErrorKind::MissingCredentials(name)) if name == destination.name
            ));
        }
    }

    #[test]
    fn test_pass_through() {
        assert_eq!(PassThrough.format("{}").unwrap(), vec!["{}"]);
        assert!(matches!(PassThrough.format("  \n"), Err(ErrorKind::Format(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_continues_past_failures() {
        let transport = MockTransport::new();
        transport.script("2", [Reply::status(404)]);
        let dispatcher =
            Dispatcher::with_transport(mock_base_url(), transport.clone(), RateLimitConfig::default());
        let destinations = [
            destination("unconfigured", "", ""),
            destination("gone", "2", "token"),
            destination("ok", "1", "token"),
        ];
        let bodies = vec![String::from("one"), String::from("two")];

        let summary = relay(&dispatcher, &destinations, &bodies, &HeaderMap::new()).await;

        assert!(!summary.is_success());
        assert_eq!(summary.delivered, 3);
        let failed: Vec<_> = summary.failed.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, vec!["unconfigured", "gone"]);
        assert!(matches!(summary.failed[0].1, ErrorKind::MissingCredentials(_)));
        assert_eq!(transport.calls().len(), 4);
    }
}
