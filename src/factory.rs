//! A process-wide cache of named HTTP clients.
//!
//! Every entry is a `reqwest::Client`, so clients handed out under the same
//! name share one connection pool. The base address lives on the returned
//! [`HttpClient`] rather than in the cache, which keeps cached entries
//! immutable.

use crate::transport::normalize_base_address;
use crate::{Error, HttpClient, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::type_name;

static CLIENTS: Lazy<DashMap<String, reqwest::Client>> = Lazy::new(DashMap::new);

/// Hands out cached [`HttpClient`]s keyed by name, URL or type.
///
/// # Examples
///
/// ```no_run
/// use restwright::ClientFactory;
///
/// struct GithubApi;
///
/// # async fn example() -> Result<(), restwright::Error> {
/// let client = ClientFactory::create_type_client::<GithubApi>(Some("https://api.github.com"))?;
/// let response = client.rest()?.set_paths(["zen"]).get().await?;
/// println!("{}", response.text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientFactory;

impl ClientFactory {
    /// Returns the client cached under `name`, creating it on first use.
    ///
    /// The returned client has no base address.
    pub fn create_client(name: &str) -> Result<HttpClient> {
        Ok(HttpClient::from_reqwest(cached(name)?))
    }

    /// Returns a client cached under `base_url` and bound to it.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is blank or invalid.
    pub fn create_url_client(base_url: &str) -> Result<HttpClient> {
        let base = normalize_base_address(base_url)?;
        HttpClient::from_reqwest(cached(base.as_str())?).with_base_address(base.as_str())
    }

    /// Returns a client cached under the name of `T`, bound to `base_url`
    /// when one is given and not blank.
    pub fn create_type_client<T>(base_url: Option<&str>) -> Result<HttpClient>
    where
        T: ?Sized,
    {
        let client = HttpClient::from_reqwest(cached(type_name::<T>())?);
        match base_url.filter(|url| !url.trim().is_empty()) {
            Some(base_url) => client.with_base_address(base_url),
            None => Ok(client),
        }
    }

    /// Returns `true` if a client is cached under `name`.
    pub fn is_cached(name: &str) -> bool {
        CLIENTS.contains_key(name)
    }
}

fn cached(name: &str) -> Result<reqwest::Client> {
    if let Some(client) = CLIENTS.get(name) {
        tracing::debug!(client = name, "Client cache hit");
        return Ok(client.clone());
    }

    let entry = CLIENTS.entry(name.to_string()).or_try_insert_with(|| {
        tracing::debug!(client = name, "Client cache miss, creating client");
        reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
    })?;
    Ok(entry.value().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transport;

    struct ReportsApi;

    #[test]
    fn test_create_client_adds_to_cache() {
        let name = "factory-test-named";
        let client = ClientFactory::create_client(name).unwrap();

        assert!(ClientFactory::is_cached(name));
        assert!(client.base_address().is_none());

        ClientFactory::create_client(name).unwrap();
        assert!(ClientFactory::is_cached(name));
    }

    #[test]
    fn test_url_client_is_bound_to_its_url() {
        let client = ClientFactory::create_url_client("http://localhost:7001/api").unwrap();

        assert_eq!(
            client.base_address().map(|url| url.as_str()),
            Some("http://localhost:7001/api/")
        );
        assert!(ClientFactory::is_cached("http://localhost:7001/api/"));
        assert!(ClientFactory::create_url_client(" ").unwrap_err().is_configuration());
    }

    #[test]
    fn test_type_client_keyed_by_type_name() {
        let client = ClientFactory::create_type_client::<ReportsApi>(None).unwrap();
        assert!(client.base_address().is_none());
        assert!(ClientFactory::is_cached(type_name::<ReportsApi>()));

        let client =
            ClientFactory::create_type_client::<ReportsApi>(Some("http://localhost:7002")).unwrap();
        assert_eq!(
            client.base_address().map(|url| url.as_str()),
            Some("http://localhost:7002/")
        );
    }

    #[test]
    fn test_concurrent_callers_share_one_entry() {
        let name = "factory-test-concurrent";
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| ClientFactory::create_client(name).unwrap());
            }
        });
        assert!(ClientFactory::is_cached(name));
    }
}
