//! The fluent request builder.
//!
//! A [`RestRequest`] owns a draft (URL, headers, body, retry options) bound to
//! one [`Transport`]. Builder calls consume and return the request; sending
//! consumes it for good, so each request is sent at most once.

use crate::auth::AuthHeaders;
use crate::content::{Content, MultipartForm, APPLICATION_JSON, DEFAULT_BOUNDARY, MULTIPART_FORM_DATA};
use crate::serialization::{to_json_string, to_parameters, JsonSerializer, SerializerRegistry};
use crate::transport::normalize_base_address;
use crate::uri::{PathSegment, UriBuilder};
use crate::{Error, HttpClient, RestResponse, Result, RetryOptions, Transport, TransportRequest};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// A request built with fluent calls and sent through a [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use restwright::HttpClient;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Filter<'a> {
///     id: &'a str,
///     name: &'a str,
/// }
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let client = HttpClient::builder().base_address("https://google.com/api/sample/")?.build()?;
///
/// let response = client
///     .rest()?
///     .set_paths(["name", "value", "context"])
///     .set_bearer_token("testToken")?
///     .add_queries(&Filter { id: "someId", name: "someName" })?
///     .set_json_content(&serde_json::json!({ "id": "also an id" }))?
///     .configure_retry(|retry| retry.maximum_attempts = 5)
///     .post()
///     .await?;
///
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub struct RestRequest<T = HttpClient> {
    transport: T,
    uri: UriBuilder,
    headers: HeaderMap,
    content: Option<Content>,
    retry: Option<RetryOptions>,
    serializer: Arc<dyn JsonSerializer>,
}

impl<T> RestRequest<T>
where
    T: Transport,
{
    /// Starts a request against the transport's base address.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the transport has no base address.
    pub fn new(transport: T) -> Result<Self> {
        let base = transport.base_address().cloned().ok_or_else(|| {
            Error::config("The transport must have a base address, or one must be supplied")
        })?;
        Ok(Self::from_parts(transport, base))
    }

    /// Starts a request against `base_address`, overriding whatever base the
    /// transport carries.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_address` is blank or not a valid URL.
    pub fn with_base_address(transport: T, base_address: &str) -> Result<Self> {
        let base = normalize_base_address(base_address)?;
        Ok(Self::from_parts(transport, base))
    }

    fn from_parts(transport: T, base: Url) -> Self {
        Self {
            transport,
            uri: UriBuilder::new(base),
            headers: HeaderMap::new(),
            content: None,
            retry: None,
            serializer: SerializerRegistry::global().current(),
        }
    }

    /// Uses `serializer` for this request's JSON bodies and parameter objects
    /// instead of the process-wide default.
    pub fn with_serializer(mut self, serializer: Arc<dyn JsonSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// The URL as composed so far.
    pub fn current_uri(&self) -> &Url {
        self.uri.url()
    }

    /// The headers set so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body set so far.
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// The retry options, if retries were enabled.
    pub fn retry_options(&self) -> Option<&RetryOptions> {
        self.retry.as_ref()
    }

    /// Appends path segments; see [`UriBuilder::set_paths`].
    pub fn set_paths<I>(mut self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: PathSegment,
    {
        self.uri.set_paths(segments);
        self
    }

    /// Sets query parameter `name`. An empty name is ignored.
    pub fn add_query(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.uri.add_query(name, &value.to_string());
        self
    }

    /// Sets query parameter `name` unless `value` is `None`.
    pub fn add_optional_query<V>(mut self, name: &str, value: Option<V>) -> Self
    where
        V: fmt::Display,
    {
        self.uri
            .add_optional_query(name, value.map(|v| v.to_string()));
        self
    }

    /// Sets one query parameter per key/value pair of `values`, skipping
    /// `null` values. A `null` `values` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConversionFailed`] if `values` is neither an object
    /// nor a sequence of pairs.
    pub fn add_queries<V>(mut self, values: &V) -> Result<Self>
    where
        V: Serialize + ?Sized,
    {
        let Some(pairs) = to_parameters(self.serializer.as_ref(), values)? else {
            return Ok(self);
        };
        for (name, value) in pairs {
            self.uri.add_optional_query(&name, value);
        }
        Ok(self)
    }

    /// Sets header `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a blank key or an invalid name or value.
    pub fn set_header(mut self, key: &str, value: &str) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(Error::config("Header key cannot be blank"));
        }
        let name = HeaderName::try_from(key)
            .map_err(|e| Error::config(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| Error::config(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets one header per key/value pair of `values`; `null` values become
    /// empty headers. A `null` `values` is a no-op.
    pub fn set_headers<V>(mut self, values: &V) -> Result<Self>
    where
        V: Serialize + ?Sized,
    {
        let Some(pairs) = to_parameters(self.serializer.as_ref(), values)? else {
            return Ok(self);
        };
        for (key, value) in pairs {
            self = self.set_header(&key, value.as_deref().unwrap_or_default())?;
        }
        Ok(self)
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn set_bearer_token(mut self, token: &str) -> Result<Self> {
        self.headers.set_bearer_token(token)?;
        Ok(self)
    }

    /// Sets `Authorization: Basic <base64(username:password)>`.
    pub fn set_basic_token(mut self, username: &str, password: &str) -> Result<Self> {
        self.headers.set_basic_token(username, password)?;
        Ok(self)
    }

    /// Sets `content` serialized as an `application/json` body. A value that
    /// serializes to `null` (such as `None`) leaves the body untouched.
    pub fn set_json_content<V>(mut self, content: &V) -> Result<Self>
    where
        V: Serialize + ?Sized,
    {
        let value = serde_json::to_value(content)
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;
        if value.is_null() {
            return Ok(self);
        }
        let json = to_json_string(self.serializer.as_ref(), &value)?;
        self.content = Some(Content::new(json, APPLICATION_JSON));
        Ok(self)
    }

    /// Sets a text body. Empty `content` is a no-op; the media type defaults
    /// to `text/plain`.
    pub fn with_string_content(mut self, content: &str, media_type: Option<&str>) -> Self {
        if content.is_empty() {
            return self;
        }
        self.content = Some(Content::text(content, media_type));
        self
    }

    /// Sets a url-encoded form body from the key/value pairs of `values`,
    /// leaving out `null` values. No pairs at all is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConversionFailed`] if `values` is neither an object
    /// nor a sequence of pairs.
    pub fn set_form_content<V>(mut self, values: &V) -> Result<Self>
    where
        V: Serialize + ?Sized,
    {
        let pairs: Vec<(String, String)> = to_parameters(self.serializer.as_ref(), values)?
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect();
        if pairs.is_empty() {
            return Ok(self);
        }
        self.content = Some(Content::form(pairs));
        Ok(self)
    }

    /// Sets a multipart body built by `build`, with the default media type
    /// and boundary.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), restwright::Error> {
    /// # let client = restwright::HttpClient::builder().base_address("https://api.example.com")?.build()?;
    /// let response = client
    ///     .rest()?
    ///     .set_paths(["uploads"])
    ///     .set_multipart_form_data(|form| {
    ///         form.add_string("title", "Q3 report", None)?;
    ///         form.add_file("file", "reports/q3.pdf", Some("application/pdf"))?;
    ///         Ok(())
    ///     })?
    ///     .post()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_multipart_form_data<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(&mut MultipartForm) -> Result<()>,
    {
        self.set_multipart_form_data_with(
            Some(MULTIPART_FORM_DATA),
            DEFAULT_BOUNDARY,
            build,
        )
    }

    /// Sets a multipart body built by `build`. A `None` or blank `media_type`
    /// falls back to `multipart/form-data`.
    pub fn set_multipart_form_data_with<F>(
        mut self,
        media_type: Option<&str>,
        boundary: &str,
        build: F,
    ) -> Result<Self>
    where
        F: FnOnce(&mut MultipartForm) -> Result<()>,
    {
        let mut form = MultipartForm::with_boundary(boundary);
        form.media_type(media_type).serializer(self.serializer.clone());
        build(&mut form)?;
        self.content = Some(form.into_content());
        Ok(self)
    }

    /// Retries the send with default [`RetryOptions`].
    pub fn use_retry(self) -> Self {
        self.configure_retry(|_| {})
    }

    /// Retries the send with [`RetryOptions`] adjusted by `configure`.
    pub fn configure_retry<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut RetryOptions),
    {
        let mut options = RetryOptions::default();
        configure(&mut options);
        self.retry = Some(options);
        self
    }

    fn materialize(&self, method: &Method) -> TransportRequest {
        TransportRequest {
            method: method.clone(),
            url: self.uri.url().clone(),
            headers: self.headers.clone(),
            content: self.content.clone(),
        }
    }

    /// Sends the request with `method`, retrying if retries were enabled.
    ///
    /// Any received response is returned, whatever its status; only a failure
    /// to get a response is an error.
    pub async fn send(mut self, method: Method) -> Result<RestResponse> {
        tracing::debug!(
            method = %method,
            url = %self.uri.url(),
            retry = self.retry.is_some(),
            "Sending REST request"
        );

        match self.retry.take() {
            Some(options) => {
                let this = &self;
                let method = &method;
                crate::retry::with_retry(
                    move || this.transport.send(this.materialize(method)),
                    options,
                )
                .await
            }
            None => {
                let start_time = Instant::now();
                let mut response = self.transport.send(self.materialize(&method)).await?;
                response.attempts = 1;
                response.latency = start_time.elapsed();
                Ok(response)
            }
        }
    }

    /// Sends the request as `GET`.
    pub async fn get(self) -> Result<RestResponse> {
        self.send(Method::GET).await
    }

    /// Sends the request as `POST`.
    pub async fn post(self) -> Result<RestResponse> {
        self.send(Method::POST).await
    }

    /// Sends the request as `PUT`.
    pub async fn put(self) -> Result<RestResponse> {
        self.send(Method::PUT).await
    }

    /// Sends the request as `PATCH`.
    pub async fn patch(self) -> Result<RestResponse> {
        self.send(Method::PATCH).await
    }

    /// Sends the request as `DELETE`.
    pub async fn delete(self) -> Result<RestResponse> {
        self.send(Method::DELETE).await
    }
}

impl<T> fmt::Debug for RestRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRequest")
            .field("uri", &self.uri.url().as_str())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("content_type", &self.content.as_ref().map(Content::content_type))
            .field("retry", &self.retry)
            .field("serializer", &self.serializer.name())
            .finish()
    }
}

impl HttpClient {
    /// Starts a [`RestRequest`] against this client's base address.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client has no base address.
    pub fn rest(&self) -> Result<RestRequest<HttpClient>> {
        RestRequest::new(self.clone())
    }

    /// Starts a [`RestRequest`] against `base_address`.
    pub fn rest_with_base_address(&self, base_address: &str) -> Result<RestRequest<HttpClient>> {
        RestRequest::with_base_address(self.clone(), base_address)
    }
}
