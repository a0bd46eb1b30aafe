//! In-memory transport for exercising request code without a server.

use crate::serialization::{to_json_string, SerializerRegistry};
use crate::transport::normalize_base_address;
use crate::{Error, RestResponse, Result, Transport, TransportRequest};
use async_trait::async_trait;
use http::StatusCode;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use url::Url;

#[derive(Debug, Default)]
struct Script {
    responses: Vec<RestResponse>,
    next: usize,
    requests: Vec<TransportRequest>,
}

/// A [`Transport`] that answers with scripted responses, in order,
/// whatever the request.
///
/// Every request is recorded and can be inspected with
/// [`requests`](Self::requests). Sending after the script runs out is an
/// error rather than a hang.
///
/// # Examples
///
/// ```
/// use restwright::testing::MockTransport;
/// use restwright::RestRequest;
/// use http::StatusCode;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let transport = Arc::new(MockTransport::new("https://localhost")?);
/// transport.respond_with_status(StatusCode::REQUEST_TIMEOUT);
/// transport.respond_with_status(StatusCode::OK);
///
/// let response = RestRequest::new(transport.clone())?.use_retry().get().await?;
/// assert_eq!(response.status.as_u16(), 200);
/// assert_eq!(transport.requests().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    base_address: Option<Url>,
    script: Mutex<Script>,
}

impl MockTransport {
    /// A mock bound to `base_address`.
    pub fn new(base_address: &str) -> Result<Self> {
        Ok(Self {
            base_address: Some(normalize_base_address(base_address)?),
            script: Mutex::new(Script::default()),
        })
    }

    /// A mock with no base address.
    pub fn without_base_address() -> Self {
        Self {
            base_address: None,
            script: Mutex::new(Script::default()),
        }
    }

    /// Queues responses after any already queued.
    pub fn respond_with(&self, responses: impl IntoIterator<Item = RestResponse>) {
        self.lock().responses.extend(responses);
    }

    /// Queues an empty response with `status`.
    pub fn respond_with_status(&self, status: StatusCode) {
        self.respond_with([RestResponse::new(status)]);
    }

    /// Queues a response whose body is `item` as JSON.
    pub fn respond_with_json<T>(&self, item: &T, status: StatusCode) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let serializer = SerializerRegistry::global().current();
        let body = to_json_string(serializer.as_ref(), item)?;
        self.respond_with([RestResponse::new(status).with_body(body)]);
        Ok(())
    }

    /// Drops every queued response, used or not.
    pub fn clear_responses(&self) {
        let mut script = self.lock();
        script.responses.clear();
        script.next = 0;
    }

    /// The requests received so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn base_address(&self) -> Option<&Url> {
        self.base_address.as_ref()
    }

    async fn send(&self, request: TransportRequest) -> Result<RestResponse> {
        let mut script = self.lock();
        script.requests.push(request);

        if script.responses.is_empty() {
            return Err(Error::Transport("No response messages are configured".to_string()));
        }
        let Some(response) = script.responses.get(script.next).cloned() else {
            return Err(Error::Transport(
                "All response messages have been exhausted".to_string(),
            ));
        };
        script.next += 1;
        Ok(response)
    }
}
