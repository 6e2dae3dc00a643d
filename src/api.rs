//! HTTP access to the remote API.
//!
//! - [`ApiClient`]: shared client, attaches the bearer token and maps non-2xx
//!   responses to [`ApiError::Status`]
//! - [`Transport`]: the network seam, implemented by [`ReqwestTransport`] and
//!   [`mock::MockTransport`]
//! - [`TokenStore`]: the single persisted token slot

mod client;
mod error;
pub mod mock;
mod token;
mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use token::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore};
pub use transport::{ApiRequest, Body, RawResponse, ReqwestTransport, Transport};
