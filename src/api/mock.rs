//! In-memory transport for testing.
//!
//! [`MockTransport`] serves canned responses keyed by method and route, and
//! records every request it receives so tests can assert on the exact calls
//! a screen or hook made.
//!
//! ```
//! use apidesk::api::mock::{MockResponse, MockTransport};
//! use reqwest::Method;
//! use serde_json::json;
//!
//! let transport = MockTransport::new();
//! transport.respond(Method::GET, "/api/users", MockResponse::json(200, json!([])));
//! assert_eq!(transport.request_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Method;

use super::error::ApiError;
use super::transport::{ApiRequest, RawResponse, Transport};

/// A canned reply for [`MockTransport`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    Reply(RawResponse),
    /// Fail the exchange as if the network were down.
    NetworkError(String),
}

impl MockResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Reply(RawResponse {
            status,
            body: body.to_string().into_bytes(),
        })
    }

    pub fn empty(status: u16) -> Self {
        Self::Reply(RawResponse {
            status,
            body: Vec::new(),
        })
    }

    pub fn network_error(message: &str) -> Self {
        Self::NetworkError(message.to_string())
    }
}

#[derive(Debug, Default)]
struct Inner {
    // Responses per (method, route). The last queued response is sticky.
    routes: HashMap<(Method, String), Vec<MockResponse>>,
    requests: Vec<ApiRequest>,
}

/// A [`Transport`] that never touches the network.
///
/// Unknown routes answer `404 {"detail": "Not Found"}`.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
    delay: Option<Duration>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response, keeping requests in flight long enough for
    /// concurrency tests to overlap them.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a response for `method route`.
    pub fn respond(&self, method: Method, route: &str, response: MockResponse) {
        self.lock()
            .routes
            .entry((method, route.to_string()))
            .or_default()
            .push(response);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Requests matching `method route`.
    pub fn requests_to(&self, method: &Method, route: &str) -> Vec<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| &r.method == method && r.route() == route)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, request: &ApiRequest) -> MockResponse {
        let mut inner = self.lock();
        inner.requests.push(request.clone());

        let key = (request.method.clone(), request.route().to_string());
        match inner.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => MockResponse::json(404, serde_json::json!({ "detail": "Not Found" })),
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'static, Result<RawResponse, ApiError>> {
        let response = self.next_response(&request);
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match response {
                MockResponse::Reply(raw) => Ok(raw),
                MockResponse::NetworkError(msg) => Err(ApiError::Network(msg)),
            }
        }
        .boxed()
    }
}
