use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::token::TokenStore;
use super::transport::{ApiRequest, Transport};

/// Shared HTTP client for the remote API.
///
/// Cloning is cheap; clones share the transport and the token slot. Every
/// request carries `Authorization: Bearer <token>` while a token is stored.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(transport: impl Transport, tokens: impl TokenStore) -> Self {
        Self {
            transport: Arc::new(transport),
            tokens: Arc::new(tokens),
        }
    }

    /// The token slot used by this client.
    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    /// A shared handle to the token slot, for writes made off the async
    /// workers.
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    /// Sends `request` and returns the raw body of a 2xx response.
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] if no response arrived, [`ApiError::Status`] for
    /// any non-2xx status.
    pub async fn send_raw(&self, mut request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        request.bearer = self.tokens.get();
        let label = request.to_string();
        tracing::debug!(request = %label, "sending request");

        let raw = self.transport.send(request).await.inspect_err(|e| {
            tracing::warn!(request = %label, error = %e, "request failed");
        })?;

        if raw.is_success() {
            tracing::debug!(request = %label, status = raw.status, "request succeeded");
            Ok(raw.body)
        } else {
            let err = ApiError::from_status(raw.status, &raw.body);
            tracing::warn!(request = %label, status = raw.status, error = %err, "request rejected");
            Err(err)
        }
    }

    /// Sends `request` and decodes the JSON body as `T`.
    ///
    /// An empty body decodes as JSON `null`, so endpoints without content can
    /// be read as `()`, `Option<_>` or `serde_json::Value`.
    ///
    /// # Errors
    ///
    /// As [`send_raw`](Self::send_raw), plus [`ApiError::Decode`] when the
    /// body does not match `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.send_raw(request).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(ApiRequest::new(Method::POST, path).json(body)).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::new(Method::POST, path)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(ApiRequest::new(Method::PUT, path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }
}
