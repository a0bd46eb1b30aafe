//! `Authorization` header helpers.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};

/// Scheme name for bearer tokens.
pub const BEARER: &str = "Bearer";

/// Scheme name for basic credentials.
pub const BASIC: &str = "Basic";

/// Reads and writes `Authorization: <scheme> <token>` on a header map.
///
/// Setting a token replaces whatever `Authorization` value was there before.
///
/// # Examples
///
/// ```
/// use restwright::auth::AuthHeaders;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.set_basic_token("user", "pass").unwrap();
/// assert_eq!(headers.basic_token().as_deref(), Some("dXNlcjpwYXNz"));
///
/// headers.set_bearer_token("abc").unwrap();
/// assert_eq!(headers.bearer_token().as_deref(), Some("abc"));
/// assert_eq!(headers.basic_token(), None);
/// ```
pub trait AuthHeaders {
    /// Sets `Authorization` to `<scheme> <token>`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `scheme` or `token` is blank or not
    /// valid header text.
    fn set_auth_token(&mut self, scheme: &str, token: &str) -> Result<()>;

    /// Returns the token of an `Authorization` header using `scheme`,
    /// compared case-insensitively.
    fn auth_token(&self, scheme: &str) -> Option<String>;

    /// Sets a bearer token.
    fn set_bearer_token(&mut self, token: &str) -> Result<()> {
        self.set_auth_token(BEARER, token)
    }

    /// Sets basic credentials, base64-encoding `username:password`.
    fn set_basic_token(&mut self, username: &str, password: &str) -> Result<()> {
        let token = STANDARD.encode(format!("{}:{}", username, password));
        self.set_auth_token(BASIC, &token)
    }

    /// Returns the bearer token, if any.
    fn bearer_token(&self) -> Option<String> {
        self.auth_token(BEARER)
    }

    /// Returns the (still encoded) basic token, if any.
    fn basic_token(&self) -> Option<String> {
        self.auth_token(BASIC)
    }
}

impl AuthHeaders for HeaderMap {
    fn set_auth_token(&mut self, scheme: &str, token: &str) -> Result<()> {
        if scheme.trim().is_empty() {
            return Err(Error::config("Authorization scheme cannot be blank"));
        }
        if token.trim().is_empty() {
            return Err(Error::config("Authorization token cannot be blank"));
        }

        let value = HeaderValue::try_from(format!("{} {}", scheme, token))
            .map_err(|e| Error::config(format!("Invalid authorization header: {}", e)))?;
        self.insert(AUTHORIZATION, value);
        Ok(())
    }

    fn auth_token(&self, scheme: &str) -> Option<String> {
        let value = self.get(AUTHORIZATION)?.to_str().ok()?;
        let (found, token) = value.trim().split_once(' ')?;
        if !found.eq_ignore_ascii_case(scheme) {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}
