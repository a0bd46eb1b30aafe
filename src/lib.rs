//! # Restwright - a fluent REST request builder
//!
//! Restwright builds HTTP requests with chained calls on top of `reqwest`.
//! It composes URLs from path segments and query parameters, sets headers,
//! auth tokens and bodies, and retries on retryable status codes. It also
//! walks paginated endpoints page by page.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restwright::HttpClient;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct CreateUser<'a> {
//!     name: &'a str,
//!     email: &'a str,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restwright::Error> {
//!     let client = HttpClient::builder()
//!         .base_address("https://api.example.com/v1")?
//!         .build()?;
//!
//!     // GET /v1/users/123?expand=teams
//!     let user = client
//!         .rest()?
//!         .set_paths(["users", "123"])
//!         .add_query("expand", "teams")
//!         .set_bearer_token("my-token")?
//!         .use_retry()
//!         .get()
//!         .await?
//!         .read_json_as::<User>()?;
//!     println!("{} after {} attempt(s)", user.name, user.attempts);
//!
//!     // POST /v1/users with a JSON body
//!     let created = client
//!         .rest()?
//!         .set_paths(["users"])
//!         .set_json_content(&CreateUser { name: "Alice", email: "alice@example.com" })?
//!         .post()
//!         .await?
//!         .read_json_as::<User>()?;
//!     println!("Created user with ID: {}", created.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! Retries are driven by the response, not by transport failures. By default a
//! request is retried while its status is one of 408, 425, 429, 500, 502, 503
//! or 504, up to three times, waiting 1s and doubling the wait each time:
//!
//! ```no_run
//! use restwright::HttpClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), restwright::Error> {
//! # let client = HttpClient::builder().base_address("https://api.example.com")?.build()?;
//! let response = client
//!     .rest()?
//!     .set_paths(["jobs", "42"])
//!     .configure_retry(|retry| {
//!         retry.maximum_attempts = 5;
//!         retry.delay = Duration::from_millis(200);
//!         retry.set_requirement(|response| response.status.as_u16() != 202);
//!         retry.set_acknowledgement(|attempt, status| {
//!             eprintln!("retry #{attempt} after {status}");
//!         });
//!     })
//!     .get()
//!     .await?;
//!
//! // Exhausting the retries is not an error: check the final status.
//! if !response.is_success() {
//!     eprintln!("gave up with {}", response.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Sending only fails when no response could be obtained. The typed read
//! helpers turn a failing status or an unreadable body into an error while
//! keeping the raw response:
//!
//! ```no_run
//! use restwright::{Error, HttpClient};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = HttpClient::builder().base_address("https://api.example.com")?.build()?;
//! let response = client.rest()?.set_paths(["endpoint"]).get().await?;
//! match response.read_json_as::<serde_json::Value>() {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     Err(Error::DeserializationFailed { raw_response, serde_error, status }) => {
//!         eprintln!("Failed to deserialize (status {}):", status);
//!         eprintln!("  Raw response: {}", raw_response);
//!         eprintln!("  Error: {}", serde_error);
//!     }
//!     Err(Error::HttpError { status, raw_response, .. }) => {
//!         eprintln!("HTTP error {}: {}", status, raw_response);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod content;
mod error;
pub mod factory;
pub mod pagination;
mod request;
mod response;
pub mod retry;
pub mod serialization;
pub mod testing;
mod transport;
mod uri;

pub use auth::AuthHeaders;
pub use content::{Content, MultipartForm};
pub use error::{Error, Result};
pub use factory::ClientFactory;
pub use http::Method;
pub use pagination::{Paginated, PaginatedCursor};
pub use request::RestRequest;
pub use response::{Response, RestResponse};
pub use retry::{with_retry, RetryOptions};
pub use serialization::{JsonSerializer, SerializerRegistry};
pub use transport::{HttpClient, HttpClientBuilder, Transport, TransportRequest};
pub use uri::{PathSegment, UriBuilder};
