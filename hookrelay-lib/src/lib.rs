//! `hookrelay` is a library for delivering chat webhook messages.
//!
//! Messages to the same endpoint are delivered strictly in the order they
//! were queued, while endpoints are served concurrently. Rate limits
//! announced by the remote service, per endpoint or global, are honored
//! before every call, and messages rejected with `429 Too Many Requests`
//! are retried transparently.
//!
//! ```no_run
//! use hookrelay_lib::{DispatchRequest, DispatcherBuilder, Endpoint, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let dispatcher = DispatcherBuilder::default().dispatcher()?;
//!   let request = DispatchRequest::builder()
//!       .endpoint(Endpoint::new("1234", "s3cr3t"))
//!       .body(r#"{"content":"Hello from hookrelay"}"#)
//!       .build();
//!   let response = dispatcher.dispatch(request).await?;
//!   println!("{response}");
//!   Ok(())
//! }
//! ```
//!
//! To relay one inbound event to several webhooks at once, see [`relay()`].
#![warn(missing_docs)]

// Required for the vendored and native TLS backends
#[cfg(feature = "native-tls")]
use openssl_sys as _;

mod dispatcher;
mod queue;
mod scheduler;
mod types;

pub mod ratelimit;
pub mod relay;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dispatcher::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT, Dispatcher, DispatcherBuilder};
pub use queue::Delivery;
pub use ratelimit::{RateLimitCache, RateLimitConfig};
pub use relay::{Destination, MessageFormatter, PassThrough, RelaySummary, relay};
pub use types::*;
