//! Status-code driven retries with optional exponential backoff.
//!
//! [`with_retry`] sends once, then keeps re-sending while the response fails
//! the [`RetryOptions`] requirement and attempts remain. Exhaustion is not an
//! error: the last response is returned as-is for the caller to inspect.

use crate::{RestResponse, Result};
use futures::future::BoxFuture;
use http::StatusCode;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status codes that trigger a retry by default: 408, 425, 429, 500, 502, 503, 504.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

/// Returns `true` if `status` is one of `retry_codes`, or one of
/// [`DEFAULT_RETRY_STATUS_CODES`] when `retry_codes` is empty.
///
/// # Examples
///
/// ```
/// use restwright::retry::is_retry_status_code;
/// use http::StatusCode;
///
/// assert!(is_retry_status_code(StatusCode::TOO_MANY_REQUESTS, &[]));
/// assert!(!is_retry_status_code(StatusCode::NOT_FOUND, &[]));
/// assert!(is_retry_status_code(StatusCode::NOT_FOUND, &[404]));
/// ```
pub fn is_retry_status_code(status: StatusCode, retry_codes: &[u16]) -> bool {
    let codes = if retry_codes.is_empty() {
        &DEFAULT_RETRY_STATUS_CODES[..]
    } else {
        retry_codes
    };
    codes.contains(&status.as_u16())
}

type SyncRequirement = Arc<dyn Fn(&RestResponse) -> bool + Send + Sync>;
type AsyncRequirement = Arc<dyn for<'a> Fn(&'a RestResponse) -> BoxFuture<'a, bool> + Send + Sync>;
type Acknowledgement = Arc<dyn Fn(usize, StatusCode) + Send + Sync>;

#[derive(Clone)]
enum Requirement {
    Sync(SyncRequirement),
    Async(AsyncRequirement),
}

/// Configuration for [`with_retry`].
///
/// The *requirement* decides when a response is good enough to stop: `true`
/// means no further attempt. The default requirement accepts any status not in
/// [`DEFAULT_RETRY_STATUS_CODES`].
///
/// # Examples
///
/// ```
/// use restwright::RetryOptions;
/// use std::time::Duration;
///
/// let mut options = RetryOptions::default();
/// options.maximum_attempts = 5;
/// options.delay = Duration::from_millis(250);
/// options.set_requirement(|response| response.status.as_u16() != 409);
/// options.set_acknowledgement(|attempt, status| {
///     eprintln!("retry #{attempt} after {status}");
/// });
/// ```
#[derive(Clone)]
pub struct RetryOptions {
    /// Maximum number of retries after the first attempt.
    pub maximum_attempts: usize,

    /// Wait before the next retry.
    pub delay: Duration,

    /// Whether `delay` grows by `backoff_factor` after each retry.
    pub use_backoff: bool,

    /// Multiplier applied to `delay` when `use_backoff` is set.
    pub backoff_factor: f64,

    requirement: Requirement,
    acknowledgement: Option<Acknowledgement>,
}

impl RetryOptions {
    /// Replaces the requirement with a synchronous predicate.
    pub fn set_requirement<F>(&mut self, requirement: F)
    where
        F: Fn(&RestResponse) -> bool + Send + Sync + 'static,
    {
        self.requirement = Requirement::Sync(Arc::new(requirement));
    }

    /// Replaces the requirement with an asynchronous predicate, for checks that
    /// need to await something (a token refresh, a lookup) before deciding.
    pub fn set_async_requirement<F>(&mut self, requirement: F)
    where
        F: for<'a> Fn(&'a RestResponse) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.requirement = Requirement::Async(Arc::new(requirement));
    }

    /// Sets a callback invoked before each retry with the retry number
    /// (1-indexed) and the status that caused it.
    pub fn set_acknowledgement<F>(&mut self, acknowledgement: F)
    where
        F: Fn(usize, StatusCode) + Send + Sync + 'static,
    {
        self.acknowledgement = Some(Arc::new(acknowledgement));
    }

    /// Returns `true` if an acknowledgement callback is installed.
    pub fn has_acknowledgement(&self) -> bool {
        self.acknowledgement.is_some()
    }

    /// Evaluates the requirement against `response`.
    pub async fn is_satisfied(&self, response: &RestResponse) -> bool {
        match &self.requirement {
            Requirement::Sync(requirement) => requirement(response),
            Requirement::Async(requirement) => requirement(response).await,
        }
    }

    /// Multiplies `delay` by `backoff_factor` if backoff is enabled.
    ///
    /// A factor that would produce a negative or unrepresentable delay leaves
    /// the delay unchanged.
    pub fn update_backoff(&mut self) {
        if !self.use_backoff {
            return;
        }
        if let Ok(delay) = Duration::try_from_secs_f64(self.delay.as_secs_f64() * self.backoff_factor) {
            self.delay = delay;
        }
    }

    fn acknowledge(&self, attempt: usize, status: StatusCode) {
        if let Some(acknowledgement) = &self.acknowledgement {
            acknowledgement(attempt, status);
        }
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            delay: Duration::from_secs(1),
            use_backoff: true,
            backoff_factor: 2.0,
            requirement: Requirement::Sync(Arc::new(|response: &RestResponse| {
                !is_retry_status_code(response.status, &[])
            })),
            acknowledgement: None,
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("maximum_attempts", &self.maximum_attempts)
            .field("delay", &self.delay)
            .field("use_backoff", &self.use_backoff)
            .field("backoff_factor", &self.backoff_factor)
            .field(
                "requirement",
                &match self.requirement {
                    Requirement::Sync(_) => "sync",
                    Requirement::Async(_) => "async",
                },
            )
            .field("acknowledgement", &self.acknowledgement.is_some())
            .finish()
    }
}

/// Calls `send` until its response satisfies the requirement or
/// `options.maximum_attempts` retries have been made.
///
/// `send` is always called at least once. Attempts run strictly one after
/// another with the (possibly growing) delay in between. An `Err` from `send`
/// ends the loop and is returned unchanged; only received responses are
/// judged. The returned response's `attempts` and `latency` cover the whole
/// sequence.
///
/// # Examples
///
/// ```no_run
/// use restwright::{retry::with_retry, HttpClient, Method, RetryOptions, Transport, TransportRequest};
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let client = HttpClient::builder().base_address("https://api.example.com")?.build()?;
/// let url = url::Url::parse("https://api.example.com/health")?;
///
/// let response = with_retry(
///     || client.send(TransportRequest::new(Method::GET, url.clone())),
///     RetryOptions::default(),
/// )
/// .await?;
/// println!("{} after {} attempt(s)", response.status, response.attempts);
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<F, Fut>(mut send: F, mut options: RetryOptions) -> Result<RestResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RestResponse>>,
{
    let start_time = Instant::now();
    let mut attempts = 0;
    let mut response = send().await?;

    loop {
        if options.is_satisfied(&response).await {
            break;
        }
        if attempts >= options.maximum_attempts {
            if attempts > 0 {
                tracing::warn!(
                    attempts = attempts + 1,
                    status = response.status.as_u16(),
                    "Maximum retry attempts reached"
                );
            }
            break;
        }

        attempts += 1;
        options.acknowledge(attempts, response.status);

        tracing::info!(
            attempt = attempts,
            status = response.status.as_u16(),
            delay_ms = options.delay.as_millis(),
            "Retrying request after delay"
        );

        tokio::time::sleep(options.delay).await;
        options.update_backoff();
        response = send().await?;
    }

    response.attempts = attempts + 1;
    response.latency = start_time.elapsed();
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn scripted(statuses: &[u16]) -> Mutex<VecDeque<StatusCode>> {
        Mutex::new(
            statuses
                .iter()
                .map(|code| StatusCode::from_u16(*code).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_default_values() {
        let options = RetryOptions::default();

        assert_eq!(options.maximum_attempts, 3);
        assert_eq!(options.delay, Duration::from_secs(1));
        assert!(options.use_backoff);
        assert!(!options.has_acknowledgement());
        assert_eq!(options.backoff_factor, 2.0);
    }

    #[test]
    fn test_update_backoff() {
        let mut options = RetryOptions::default();

        options.update_backoff();
        assert_eq!(options.delay, Duration::from_secs(2));

        options.update_backoff();
        assert_eq!(options.delay, Duration::from_secs(4));
    }

    #[test]
    fn test_update_backoff_disabled() {
        let mut options = RetryOptions {
            use_backoff: false,
            ..RetryOptions::default()
        };

        options.update_backoff();
        assert_eq!(options.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_default_status_codes() {
        for code in DEFAULT_RETRY_STATUS_CODES {
            assert!(is_retry_status_code(StatusCode::from_u16(code).unwrap(), &[]));
        }
        assert!(!is_retry_status_code(StatusCode::OK, &[]));
        assert!(!is_retry_status_code(StatusCode::NOT_IMPLEMENTED, &[]));
        assert!(!is_retry_status_code(StatusCode::SERVICE_UNAVAILABLE, &[418]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_sent_once_without_sleeping() {
        let calls = &AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let response = with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(RestResponse::new(StatusCode::OK).with_body("done"))
            },
            RetryOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "done");
        assert_eq!(response.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let statuses = scripted(&[408, 408, 200]);
        let acknowledged = Arc::new(Mutex::new(Vec::new()));
        let seen = acknowledged.clone();

        let mut options = RetryOptions::default();
        options.set_acknowledgement(move |attempt, status| {
            seen.lock().unwrap().push((attempt, status.as_u16()));
        });

        let started = tokio::time::Instant::now();
        let response = with_retry(
            || {
                let status = statuses.lock().unwrap().pop_front().unwrap();
                async move { Ok(RestResponse::new(status)) }
            },
            options,
        )
        .await
        .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.attempts, 3);
        assert_eq!(*acknowledged.lock().unwrap(), vec![(1, 408), (2, 408)]);
        // 1s then 2s of backoff
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_response() {
        let calls = &AtomicUsize::new(0);
        let mut options = RetryOptions::default();
        options.maximum_attempts = 2;
        options.delay = Duration::from_millis(10);

        let response = with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(RestResponse::new(StatusCode::SERVICE_UNAVAILABLE))
            },
            options,
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.was_retried());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_sends_once() {
        let calls = &AtomicUsize::new(0);
        let mut options = RetryOptions::default();
        options.maximum_attempts = 0;

        let response = with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(RestResponse::new(StatusCode::BAD_GATEWAY))
            },
            options,
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_async_requirement() {
        let statuses = scripted(&[202, 202, 201]);
        let mut options = RetryOptions::default();
        options.delay = Duration::from_millis(5);
        options.set_async_requirement(|response| {
            Box::pin(async move { response.status == StatusCode::CREATED })
        });

        let response = with_retry(
            || {
                let status = statuses.lock().unwrap().pop_front().unwrap();
                async move { Ok(RestResponse::new(status)) }
            },
            options,
        )
        .await
        .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_not_retried() {
        let calls = &AtomicUsize::new(0);

        let result = with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<RestResponse, _>(Error::Transport("connection reset".to_string()))
            },
            RetryOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    async fn count_warnings(statuses: &[u16], maximum_attempts: usize) -> (RestResponse, usize) {
        use tracing_subscriber::layer::SubscriberExt;

        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let statuses = scripted(statuses);
        let mut options = RetryOptions::default();
        options.maximum_attempts = maximum_attempts;
        options.delay = Duration::from_millis(5);

        let response = with_retry(
            || {
                let status = statuses.lock().unwrap().pop_front().unwrap();
                async move { Ok(RestResponse::new(status)) }
            },
            options,
        )
        .await
        .unwrap();

        (response, counter.0.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_last_allowed_retry_does_not_warn() {
        let (response, warnings) = count_warnings(&[503, 503, 503, 200], 3).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.attempts, 4);
        assert_eq!(warnings, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_warns_once() {
        let (response, warnings) = count_warnings(&[503, 503, 503], 2).await;

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.attempts, 3);
        assert_eq!(warnings, 1);
    }
}
