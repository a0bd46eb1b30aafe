//! The seam between request building and the wire.
//!
//! [`RestRequest`](crate::RestRequest) only ever talks to a [`Transport`]. The
//! reqwest-backed [`HttpClient`] is the production implementation;
//! [`MockTransport`](crate::testing::MockTransport) scripts responses for tests.

use crate::{Content, Error, RestResponse, Result};
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// A fully materialized request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,

    /// The absolute request URL.
    pub url: Url,

    /// Request headers. `Content-Type` comes from `content` instead.
    pub headers: HeaderMap,

    /// The request body, if any.
    pub content: Option<Content>,
}

impl TransportRequest {
    /// A request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            content: None,
        }
    }
}

/// Sends materialized requests.
///
/// Only failures to obtain a response are errors; any status the server
/// returns, success or not, comes back as a [`RestResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// The origin requests are resolved against, if the transport has one.
    fn base_address(&self) -> Option<&Url>;

    /// Sends `request` once.
    async fn send(&self, request: TransportRequest) -> Result<RestResponse>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn base_address(&self) -> Option<&Url> {
        (**self).base_address()
    }

    async fn send(&self, request: TransportRequest) -> Result<RestResponse> {
        (**self).send(request).await
    }
}

/// A reqwest-backed [`Transport`] with an optional base address.
///
/// Cloning is cheap: clones share one connection pool.
///
/// # Examples
///
/// ```no_run
/// use restwright::HttpClient;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let client = HttpClient::builder()
///     .base_address("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
///
/// let response = client.rest()?.set_paths(["status"]).get().await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_address: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Creates a new `HttpClientBuilder`.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Wraps an existing reqwest client, with no base address.
    pub fn from_reqwest(http: reqwest::Client) -> Self {
        Self {
            http,
            base_address: None,
            default_headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Returns a copy of this client bound to `base_address`.
    ///
    /// A trailing `/` is appended when missing so that relative paths extend
    /// the base instead of replacing its last segment.
    pub fn with_base_address(mut self, base_address: &str) -> Result<Self> {
        self.base_address = Some(normalize_base_address(base_address)?);
        Ok(self)
    }

    /// The underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl Transport for HttpClient {
    fn base_address(&self) -> Option<&Url> {
        self.base_address.as_ref()
    }

    async fn send(&self, request: TransportRequest) -> Result<RestResponse> {
        let start_time = Instant::now();

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Executing HTTP request"
        );

        let mut headers = merge_headers(&self.default_headers, request.headers);
        let mut builder = self.http.request(request.method, request.url);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(content) = request.content {
            let content_type = HeaderValue::try_from(content.content_type())
                .map_err(|e| Error::config(format!("Invalid content type: {}", e)))?;
            headers.insert(http::header::CONTENT_TYPE, content_type);
            builder = builder.body(content.body().clone());
        }

        builder = builder.headers(headers);

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        Ok(RestResponse {
            status,
            headers,
            body,
            latency,
            attempts: 1,
        })
    }
}

/// Builder for configuring and creating an [`HttpClient`].
pub struct HttpClientBuilder {
    base_address: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl HttpClientBuilder {
    /// Creates a new `HttpClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_address: None,
            default_headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Sets the base address requests are resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_address(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_address = Some(normalize_base_address(url.as_ref())?);
        Ok(self)
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::config(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::config(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `HttpClient`.
    ///
    /// A base address is optional here; a [`RestRequest`](crate::RestRequest)
    /// can supply one at construction instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn build(self) -> Result<HttpClient> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpClient {
            http,
            base_address: self.base_address,
            default_headers: self.default_headers,
            timeout: self.timeout,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Request headers win over defaults; each name ends up with one value.
fn merge_headers(defaults: &HeaderMap, overrides: HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    let mut current = None;
    for (name, value) in overrides {
        if let Some(name) = name {
            merged.remove(&name);
            current = Some(name);
        }
        if let Some(name) = &current {
            merged.append(name.clone(), value);
        }
    }
    merged
}

pub(crate) fn normalize_base_address(base_address: &str) -> Result<Url> {
    let trimmed = base_address.trim();
    if trimmed.is_empty() {
        return Err(Error::config("Base address cannot be blank"));
    }
    let mut url = Url::parse(trimmed)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
