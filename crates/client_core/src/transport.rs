//! Request/response plumbing between use-cases and the backend.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Non-success HTTP response: status plus the raw body, when one was readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub body: Option<String>,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http status {}", self.status)
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(HttpFailure),
    #[error("request timed out")]
    Timeout,
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http(HttpFailure {
            status,
            body: Some(body.into()),
        })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else if value.is_connect() {
            Self::Connect(value.to_string())
        } else if value.is_decode() {
            Self::Decode(value.to_string())
        } else if let Some(status) = value.status() {
            Self::Http(HttpFailure {
                status: status.as_u16(),
                body: None,
            })
        } else {
            Self::Other(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes {
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer_token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer_token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, TransportError> {
        let value =
            serde_json::to_value(body).map_err(|err| TransportError::Other(err.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn bytes(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes {
            content_type: content_type.into(),
            bytes,
        };
        self
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request. Non-2xx responses come back as
    /// [`TransportError::Http`].
    async fn perform(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(server_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| TransportError::Other(format!("invalid request path '{path}': {err}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        debug!(method = ?request.method, %url, "http: sending request");

        let mut builder = self
            .http
            .request(request.method.into(), url)
            .query(&request.query);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes {
                content_type,
                bytes,
            } => builder.header(header::CONTENT_TYPE, content_type).body(bytes),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok().filter(|body| !body.is_empty());
            return Err(TransportError::Http(HttpFailure {
                status: status.as_u16(),
                body,
            }));
        }

        let body = response.bytes().await?;
        Ok(ApiResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
