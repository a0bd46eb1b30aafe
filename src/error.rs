//! Error types for building and sending REST requests.
//!
//! Misconfiguration (a missing base address, a blank auth token, an invalid
//! header) fails fast with [`Error::ConfigurationError`]. Responses with a
//! retryable or failing status are *not* errors at the send level: they come
//! back as a [`RestResponse`](crate::RestResponse) for the caller to inspect.
//! Only the typed read helpers turn a non-success status into
//! [`Error::HttpError`].

use http::{HeaderMap, StatusCode};

/// The main error type for building and sending requests.
///
/// # Examples
///
/// ```no_run
/// use restwright::{Error, HttpClient};
///
/// # async fn example() -> Result<(), Error> {
/// let client = HttpClient::builder().base_address("https://api.example.com")?.build()?;
///
/// let response = client.rest()?.set_paths(["users", "42"]).get().await?;
/// match response.read_json_as::<serde_json::Value>() {
///     Ok(user) => println!("User: {:?}", user.data),
///     Err(Error::HttpError { status, raw_response, .. }) => {
///         eprintln!("HTTP error {}: {}", status, raw_response);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    ///
    /// These are never retried by [`with_retry`](crate::retry::with_retry); only
    /// received responses are judged by the retry requirement.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid configuration was provided.
    ///
    /// Raised synchronously, before any network call: a request without a
    /// resolvable base address, a blank auth token, an invalid header.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to serialize a payload to JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize the response body into the expected type.
    ///
    /// The raw body is kept so it can be inspected when a server returns
    /// something unexpected.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The server returned a non-2xx status to a typed read.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// An object could not be turned into key/value pairs.
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    /// Reading a local file for a multipart part failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A non-reqwest transport failed to produce a response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns `true` for errors caused by how the request was put together
    /// rather than by anything on the wire.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::ConfigurationError(_) | Error::InvalidUrl(_))
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::ConfigurationError(message.into())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
