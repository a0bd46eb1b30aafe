//! Incremental URL composition over a fixed base address.

use url::{form_urlencoded, Url};

/// A path segment that may be absent.
///
/// Absent and empty segments are skipped by [`UriBuilder::set_paths`].
pub trait PathSegment {
    /// The segment text, or `None` if the segment should be skipped.
    fn as_segment(&self) -> Option<&str>;
}

impl PathSegment for &str {
    fn as_segment(&self) -> Option<&str> {
        Some(*self)
    }
}

impl PathSegment for String {
    fn as_segment(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl PathSegment for &String {
    fn as_segment(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl PathSegment for Option<&str> {
    fn as_segment(&self) -> Option<&str> {
        *self
    }
}

impl PathSegment for Option<String> {
    fn as_segment(&self) -> Option<&str> {
        self.as_deref()
    }
}

/// Builds a request URL one path segment or query parameter at a time.
///
/// Scheme, host and port come from the base address and never change; the
/// path and query accumulate across calls.
///
/// # Examples
///
/// ```
/// use restwright::UriBuilder;
///
/// let mut uri = UriBuilder::parse("https://example.com/api/").unwrap();
/// uri.set_paths(["users", "", "john doe"]);
/// uri.add_query("expand", "groups");
/// uri.add_optional_query("cursor", None::<&str>);
///
/// assert_eq!(uri.url().as_str(), "https://example.com/api/users/john+doe?expand=groups");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriBuilder {
    url: Url,
}

impl UriBuilder {
    /// Starts from `base`.
    pub fn new(base: Url) -> Self {
        Self { url: base }
    }

    /// Parses `base` and starts from it.
    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        Url::parse(base).map(Self::new)
    }

    /// The URL composed so far.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Consumes the builder, returning the URL.
    pub fn into_url(self) -> Url {
        self.url
    }

    /// Appends segments to the path.
    ///
    /// Absent and empty segments are dropped and the rest are
    /// form-url-encoded, so `/` inside a segment becomes `%2F` and a space
    /// becomes `+`. One trailing `/` is trimmed from the current path before
    /// the segments are joined on.
    pub fn set_paths<I>(&mut self, segments: I)
    where
        I: IntoIterator,
        I::Item: PathSegment,
    {
        let encoded: Vec<String> = segments
            .into_iter()
            .filter_map(|segment| {
                segment
                    .as_segment()
                    .filter(|s| !s.is_empty())
                    .map(|s| form_urlencoded::byte_serialize(s.as_bytes()).collect())
            })
            .collect();

        if encoded.is_empty() {
            return;
        }

        let current = self.url.path();
        let prefix = current.strip_suffix('/').unwrap_or(current);
        let path = format!("{}/{}", prefix, encoded.join("/"));
        self.url.set_path(&path);
    }

    /// Sets query parameter `name` to `value`.
    ///
    /// An existing parameter of the same name is overwritten in place and any
    /// later duplicates are removed. An empty `name` is ignored; an empty
    /// `value` is kept (`name=`).
    pub fn add_query(&mut self, name: &str, value: &str) {
        if name.is_empty() {
            return;
        }

        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut replaced = false;
        for (key, existing) in self.url.query_pairs() {
            if key == name {
                if !replaced {
                    pairs.push((key.into_owned(), value.to_string()));
                    replaced = true;
                }
            } else {
                pairs.push((key.into_owned(), existing.into_owned()));
            }
        }
        if !replaced {
            pairs.push((name.to_string(), value.to_string()));
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.url.set_query(Some(&query));
    }

    /// Like [`add_query`](Self::add_query), but `None` leaves the query untouched.
    pub fn add_optional_query<V>(&mut self, name: &str, value: Option<V>)
    where
        V: AsRef<str>,
    {
        if let Some(value) = value {
            self.add_query(name, value.as_ref());
        }
    }
}
