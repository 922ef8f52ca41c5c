#![allow(unreachable_pub)]

mod endpoint;
mod error;
mod request;
mod response;

pub use endpoint::Endpoint;
pub use error::{ErrorKind, TransportError};
pub use request::DispatchRequest;
pub use response::DispatchResponse;

/// The hookrelay `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
