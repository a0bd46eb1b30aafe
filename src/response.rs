//! Raw and typed responses.
//!
//! A send always yields a [`RestResponse`]: status, headers and body exactly as
//! received, whatever the status. [`RestResponse::read_json_as`] turns it into a
//! typed [`Response`] when the status is a success and the body parses.

use crate::serialization::{JsonSerializer, SerializerRegistry};
use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A response as received from a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct RestResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The response body.
    pub body: Bytes,

    /// Time from the first attempt until this response was received.
    pub latency: Duration,

    /// How many times the request was sent to obtain this response.
    pub attempts: usize,
}

impl RestResponse {
    /// Creates a response with an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            latency: Duration::ZERO,
            attempts: 1,
        }
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns `true` if the request was sent more than once.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns a header value by name, if present and valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Deserializes the body with the process-wide serializer, ignoring the status.
    pub fn json<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let serializer = SerializerRegistry::global().current();
        self.json_with(serializer.as_ref())
    }

    /// Deserializes the body with the given serializer, ignoring the status.
    pub fn json_with<T>(&self, serializer: &dyn JsonSerializer) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let raw_body = self.text();
        serializer
            .read(&raw_body)
            .and_then(serde_json::from_value)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );
                Error::DeserializationFailed {
                    raw_response: raw_body.clone(),
                    serde_error: e.to_string(),
                    status: self.status,
                }
            })
    }

    /// Reads a successful response as JSON.
    ///
    /// A non-2xx status yields [`Error::HttpError`] carrying the raw body and
    /// headers so the failing response stays available to the caller.
    pub fn read_json_as<T>(self) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        if !self.is_success() {
            return Err(Error::HttpError {
                status: self.status,
                raw_response: self.text(),
                headers: self.headers,
            });
        }

        let data = self.json()?;
        Ok(Response {
            data,
            raw_body: self.text(),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        })
    }
}

/// A successful response with its body deserialized.
///
/// # Examples
///
/// ```no_run
/// use restwright::HttpClient;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let client = HttpClient::builder().base_address("https://api.example.com")?.build()?;
///
/// let user = client
///     .rest()?
///     .set_paths(["users", "123"])
///     .get()
///     .await?
///     .read_json_as::<User>()?;
///
/// println!("User: {}", user.name);
/// println!("Request took {:?} over {} attempt(s)", user.latency, user.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The deserialized response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The total latency of the request, including all retry attempts.
    pub latency: Duration,

    /// The number of attempts made to complete this request.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Maps the response data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use restwright::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response {
    ///     data: 42,
    ///     raw_body: "42".to_string(),
    ///     status: StatusCode::OK,
    ///     headers: HeaderMap::new(),
    ///     latency: Duration::from_millis(100),
    ///     attempts: 1,
    /// };
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
