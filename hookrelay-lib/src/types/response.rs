use std::fmt::Display;

use http::{HeaderMap, StatusCode};

/// A successful answer from a webhook endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl DispatchResponse {
    #[inline]
    #[must_use]
    /// Create new response
    pub const fn new(status: StatusCode, headers: HeaderMap, body: String) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[inline]
    #[must_use]
    /// Retrieve the status code of the response
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    #[must_use]
    /// Retrieve the response headers
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    #[must_use]
    /// Retrieve the response body
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl Display for DispatchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.status.as_u16())?;
        if let Some(reason) = self.status.canonical_reason() {
            write!(f, " {reason}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let response = DispatchResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), String::new());
        assert_eq!(response.to_string(), "[204] No Content");
    }
}
