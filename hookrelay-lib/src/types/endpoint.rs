use std::fmt;
use url::Url;

use crate::{ErrorKind, Result};

/// A type-safe representation of a remote webhook for queueing and
/// rate limiting purposes.
///
/// Two endpoints are the same logical destination if and only if their id
/// and token match. The token is a credential, so it is never printed by the
/// [`Display`](fmt::Display) or [`Debug`] implementations.
///
/// # Examples
///
/// ```
/// use hookrelay_lib::Endpoint;
/// use url::Url;
///
/// let endpoint = Endpoint::new("1234", "s3cr3t");
/// let base = Url::parse("https://discord.com/api/webhooks").unwrap();
/// let url = endpoint.url(&base, Some("github")).unwrap();
/// assert_eq!(url.as_str(), "https://discord.com/api/webhooks/1234/s3cr3t/github");
/// assert_eq!(endpoint.to_string(), "1234");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    id: String,
    token: String,
}

impl Endpoint {
    /// Create an endpoint from its webhook id and token
    #[must_use]
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
        }
    }

    /// Get the webhook id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the webhook token
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Build the URL of this endpoint below `base`, i.e.
    /// `{base}/{id}/{token}[/{variant}]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` cannot carry path segments
    /// (e.g. `mailto:` or `data:` URLs).
    pub fn url(&self, base: &Url, variant: Option<&str>) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidBaseUrl(base.to_string()))?
            .pop_if_empty()
            .push(&self.id)
            .push(&self.token)
            .extend(variant);
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let endpoint = Endpoint::new("42", "token");
        let url = endpoint
            .url(&base("https://discord.com/api/webhooks"), None)
            .unwrap();
        assert_eq!(url.as_str(), "https://discord.com/api/webhooks/42/token");
    }

    #[test]
    fn test_endpoint_url_trailing_slash() {
        let endpoint = Endpoint::new("42", "token");
        let url = endpoint
            .url(&base("https://discord.com/api/webhooks/"), None)
            .unwrap();
        assert_eq!(url.as_str(), "https://discord.com/api/webhooks/42/token");
    }

    #[test]
    fn test_endpoint_url_with_variant() {
        let endpoint = Endpoint::new("42", "token");
        let url = endpoint
            .url(&base("http://127.0.0.1:8080"), Some("github"))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/42/token/github");
    }

    #[test]
    fn test_endpoint_url_escapes_segments() {
        let endpoint = Endpoint::new("42", "to/ken");
        let url = endpoint.url(&base("http://127.0.0.1"), None).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1/42/to%2Fken");
    }

    #[test]
    fn test_endpoint_url_invalid_base() {
        let endpoint = Endpoint::new("42", "token");
        let result = endpoint.url(&base("mailto:relay@example.com"), None);
        assert!(matches!(result, Err(ErrorKind::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_endpoint_identity() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Endpoint::new("1", "a"), "first");

        assert_eq!(map.get(&Endpoint::new("1", "a")), Some(&"first"));
        assert_eq!(map.get(&Endpoint::new("1", "b")), None);
    }

    #[test]
    fn test_endpoint_hides_token() {
        let endpoint = Endpoint::new("1", "hunter2");
        assert_eq!(format!("{endpoint}"), "1");
        assert!(!format!("{endpoint:?}").contains("hunter2"));
    }
}
