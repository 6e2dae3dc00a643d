//! The HTTP seam between the API client and the network.
//!
//! [`ApiClient`](super::ApiClient) builds an [`ApiRequest`] and hands it to a
//! [`Transport`]. Production code uses [`ReqwestTransport`]; tests use
//! [`MockTransport`](super::mock::MockTransport), which records requests and
//! serves canned responses.

use std::fmt;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Method;
use reqwest::multipart::{Form, Part};

use crate::models::UploadFile;

use super::error::ApiError;

/// Request body variants supported by the remote API.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    /// `multipart/form-data`, one part per `(field name, file)`.
    Multipart(Vec<(String, UploadFile)>),
}

/// A transport-independent HTTP request, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/api/data/3`. May carry an inline
    /// query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            bearer: None,
        }
    }

    #[must_use]
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    #[must_use]
    pub fn multipart(mut self, parts: Vec<(String, UploadFile)>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    /// Path without any inline query string.
    pub fn route(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(route, _)| route)
    }

    /// Value of a query parameter, looking at both the inline query string
    /// and the explicit parameters.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let inline = self
            .path
            .split_once('?')
            .map(|(_, qs)| qs)
            .unwrap_or_default()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()));

        inline
            .chain(self.query.iter().cloned())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// JSON body, if any.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends requests to the remote API.
///
/// Implementations resolve to `Ok` for every response the server produced,
/// whatever its status; `Err` is reserved for exchanges that failed outright.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: ApiRequest) -> BoxFuture<'static, Result<RawResponse, ApiError>>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'static, Result<RawResponse, ApiError>> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method, url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(files) => {
                let mut form = Form::new();
                for (field, file) in files {
                    let mut part = Part::bytes(file.bytes).file_name(file.file_name);
                    if let Some(mime) = &file.content_type {
                        part = match part.mime_str(mime) {
                            Ok(part) => part,
                            Err(e) => return futures::future::ready(Err(e.into())).boxed(),
                        };
                    }
                    form = form.part(field, part);
                }
                builder.multipart(form)
            }
        };

        async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(RawResponse { status, body })
        }
        .boxed()
    }
}
