//! Page-by-page iteration over paginated endpoints.

use crate::{Error, Result};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// The items on this page.
    pub items: Vec<T>,

    /// The 1-based number of this page.
    pub current_page: u32,

    /// Whether another page follows this one.
    pub has_more: bool,
}

impl<T> Paginated<T> {
    /// The number of the following page, if there is one.
    ///
    /// Returns `None` at `u32::MAX` even when `has_more` is set.
    pub fn next_page(&self) -> Option<u32> {
        if !self.has_more {
            return None;
        }
        self.current_page.checked_add(1)
    }
}

/// Walks a paginated endpoint one page per [`move_next`](Self::move_next).
///
/// `fetch` is called with `(page, page_size)` and resolves to a page or an
/// error. The cursor stops for good after a page without `has_more`, or after
/// the first error, which stays available through
/// [`last_error`](Self::last_error).
///
/// # Examples
///
/// ```no_run
/// use restwright::{HttpClient, Paginated, PaginatedCursor};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Order {
///     id: u64,
/// }
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let client = HttpClient::builder().base_address("https://api.example.com")?.build()?;
///
/// let mut orders = PaginatedCursor::new(None, Some(50), |page, size| {
///     let client = client.clone();
///     async move {
///         client
///             .rest()?
///             .set_paths(["orders"])
///             .add_query("page", page)
///             .add_query("size", size)
///             .get()
///             .await?
///             .json::<Paginated<Order>>()
///     }
/// });
///
/// while orders.move_next().await {
///     for order in &orders.current().unwrap().items {
///         println!("{}", order.id);
///     }
/// }
/// if let Some(err) = orders.last_error() {
///     eprintln!("stopped early: {}", err);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PaginatedCursor<T, F> {
    fetch: F,
    page: u32,
    page_size: u32,
    current: Option<Paginated<T>>,
    exhausted: bool,
    last_error: Option<Error>,
}

impl<T, F, Fut> PaginatedCursor<T, F>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Paginated<T>>>,
{
    /// Creates a cursor starting at `start_page` (default 1) with
    /// `page_size` (default 0, meaning "let the server decide").
    pub fn new(start_page: Option<u32>, page_size: Option<u32>, fetch: F) -> Self {
        Self {
            fetch,
            page: start_page.unwrap_or(1),
            page_size: page_size.unwrap_or(0),
            current: None,
            exhausted: false,
            last_error: None,
        }
    }

    /// Fetches the next page.
    ///
    /// Returns `true` if a page was received, even if it is the last one, and
    /// `false` once the cursor is exhausted or the fetch failed. An exhausted
    /// cursor never calls `fetch` again.
    pub async fn move_next(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        tracing::debug!(page = self.page, page_size = self.page_size, "Fetching page");

        match (self.fetch)(self.page, self.page_size).await {
            Ok(page) => {
                match self.page.checked_add(1).filter(|_| page.has_more) {
                    Some(next) => self.page = next,
                    None => {
                        tracing::debug!(page = self.page, "Pagination exhausted");
                        self.exhausted = true;
                    }
                }
                self.current = Some(page);
                true
            }
            Err(err) => {
                tracing::debug!(page = self.page, error = %err, "Page fetch failed");
                self.exhausted = true;
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Blocks the calling thread on [`move_next`](Self::move_next).
    ///
    /// # Errors
    ///
    /// Returns a configuration error when called from inside a tokio runtime,
    /// and [`Error::Io`] if the private runtime cannot be started.
    pub fn move_next_blocking(&mut self) -> Result<bool> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::config(
                "move_next_blocking cannot be called from within an async runtime",
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.move_next()))
    }

    /// Turns the cursor into a stream of pages.
    ///
    /// The stream ends after the last page, or yields the fetch error as its
    /// final item.
    pub fn into_stream(self) -> impl Stream<Item = Result<Paginated<T>>> {
        futures::stream::unfold(Some(self), |state| async move {
            let mut cursor = match state {
                Some(cursor) => cursor,
                None => return None,
            };
            if cursor.move_next().await {
                match cursor.current.take() {
                    Some(page) => Some((Ok(page), Some(cursor))),
                    None => None,
                }
            } else {
                cursor.last_error.take().map(|err| (Err(err), None))
            }
        })
    }
}

impl<T, F> PaginatedCursor<T, F> {
    /// The most recently received page.
    pub fn current(&self) -> Option<&Paginated<T>> {
        self.current.as_ref()
    }

    /// Returns `false` once no further page will be fetched.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// The page number the next fetch will request.
    pub fn current_page(&self) -> u32 {
        self.page
    }

    /// The page size passed to every fetch.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The error that stopped the cursor, if any.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }
}

impl<T, F> fmt::Debug for PaginatedCursor<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedCursor")
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("exhausted", &self.exhausted)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
