use http::HeaderMap;
use typed_builder::TypedBuilder;

use crate::Endpoint;

/// A message to deliver to a single [`Endpoint`].
///
/// Requests are immutable once built. When an attempt is rejected with
/// `429 Too Many Requests`, the very same value is sent again.
///
/// # Examples
///
/// ```
/// use hookrelay_lib::{DispatchRequest, Endpoint};
///
/// let request = DispatchRequest::builder()
///     .endpoint(Endpoint::new("1234", "s3cr3t"))
///     .body(r#"{"content":"pushed 3 commits"}"#)
///     .name("push to main")
///     .build();
/// assert_eq!(request.name(), "push to main");
/// assert_eq!(request.variant(), None);
/// ```
#[derive(TypedBuilder, Debug, Clone, PartialEq, Eq)]
#[builder(field_defaults(setter(into)))]
pub struct DispatchRequest {
    /// Target webhook
    endpoint: Endpoint,

    /// Optional path suffix selecting an endpoint-specific flavor,
    /// e.g. `github` for a GitHub-compatible webhook.
    #[builder(default)]
    variant: Option<String>,

    /// Headers sent along with the message, e.g. `Content-Type`
    #[builder(default)]
    headers: HeaderMap,

    /// Query parameters appended to the endpoint URL
    #[builder(default)]
    query: Vec<(String, String)>,

    /// Message body
    body: String,

    /// Human-readable name, only used for diagnostics
    #[builder(default_code = "String::from(\"message\")")]
    name: String,
}

impl DispatchRequest {
    /// The target webhook
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The endpoint variant suffix, if any
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// The headers sent with every attempt
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The query parameters sent with every attempt
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The message body
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The diagnostic name of this message
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
