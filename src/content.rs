//! Request bodies: JSON, plain text, url-encoded forms and multipart forms.

use crate::serialization::{to_json_string, to_parameters, JsonSerializer};
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::path::Path;
use url::form_urlencoded;

/// `application/json`
pub const APPLICATION_JSON: &str = "application/json";
/// `text/plain`
pub const TEXT_PLAIN: &str = "text/plain";
/// `application/x-www-form-urlencoded`
pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
/// `application/octet-stream`
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Boundary used by multipart bodies unless another one is given.
pub const DEFAULT_BOUNDARY: &str = "----WebKitFormBoundary7GuI94hQ253xT0v";

/// A request body with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    body: Bytes,
    content_type: String,
}

impl Content {
    /// Raw bytes with an explicit content type.
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    /// Text with the given media type, or `text/plain` when it is `None` or blank.
    pub fn text(body: impl Into<String>, media_type: Option<&str>) -> Self {
        let media_type = media_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(TEXT_PLAIN);
        Self::new(body.into(), media_type)
    }

    /// `value` serialized as `application/json`.
    pub fn json<T>(serializer: &dyn JsonSerializer, value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self::new(to_json_string(serializer, value)?, APPLICATION_JSON))
    }

    /// Pairs encoded as `application/x-www-form-urlencoded`.
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self::new(encoded, FORM_URL_ENCODED)
    }

    /// The body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The `Content-Type` header value.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The body as UTF-8 text, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes a url-encoded body back into pairs.
    ///
    /// Returns an empty list for any other content type.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        if self.content_type != FORM_URL_ENCODED {
            return Vec::new();
        }
        form_urlencoded::parse(&self.body).into_owned().collect()
    }
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    body: Bytes,
}

/// A `multipart/form-data` body under construction.
///
/// # Examples
///
/// ```
/// use restwright::MultipartForm;
/// use serde_json::json;
///
/// let mut form = MultipartForm::new();
/// form.add_string("title", "Quarterly report", None).unwrap();
/// form.add_json("meta", &json!({ "draft": true })).unwrap();
///
/// let content = form.into_content();
/// assert_eq!(
///     content.content_type(),
///     "multipart/form-data; boundary=----WebKitFormBoundary7GuI94hQ253xT0v"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    media_type: String,
    serializer: std::sync::Arc<dyn JsonSerializer>,
    parts: Vec<Part>,
}

impl MultipartForm {
    /// An empty form with the default boundary and media type.
    pub fn new() -> Self {
        Self::with_boundary(DEFAULT_BOUNDARY)
    }

    /// An empty form with a custom boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            media_type: MULTIPART_FORM_DATA.to_string(),
            serializer: crate::serialization::SerializerRegistry::global().current(),
            parts: Vec::new(),
        }
    }

    /// Overrides the media type; `None` or blank keeps `multipart/form-data`.
    pub fn media_type(&mut self, media_type: Option<&str>) -> &mut Self {
        if let Some(media_type) = media_type.filter(|m| !m.trim().is_empty()) {
            self.media_type = media_type.to_string();
        }
        self
    }

    /// Sets the serializer used by the JSON and string-parts helpers.
    pub fn serializer(&mut self, serializer: std::sync::Arc<dyn JsonSerializer>) -> &mut Self {
        self.serializer = serializer;
        self
    }

    /// The boundary separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Number of parts added so far.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if no parts were added.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Adds `content` as the part named `name`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `name` is blank.
    pub fn add_content(&mut self, name: &str, content: Content) -> Result<&mut Self> {
        require_name(name)?;
        self.parts.push(Part {
            name: name.to_string(),
            file_name: None,
            content_type: Some(content.content_type),
            body: content.body,
        });
        Ok(self)
    }

    /// Adds the file at `path` as the part named `name`.
    ///
    /// The part's file name is the last component of `path`; the content type
    /// defaults to `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a blank name or path and
    /// [`Error::Io`] if the file cannot be read.
    pub fn add_file(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        content_type: Option<&str>,
    ) -> Result<&mut Self> {
        require_name(name)?;
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::config("File path cannot be blank"));
        }

        let body = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned());

        tracing::debug!(part = name, path = %path.display(), bytes = body.len(), "Adding file part");

        self.parts.push(Part {
            name: name.to_string(),
            file_name,
            content_type: Some(
                content_type
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or(OCTET_STREAM)
                    .to_string(),
            ),
            body: body.into(),
        });
        Ok(self)
    }

    /// Adds `data` serialized as an `application/json` part.
    pub fn add_json<T>(&mut self, name: &str, data: &T) -> Result<&mut Self>
    where
        T: Serialize + ?Sized,
    {
        let content = Content::json(self.serializer.as_ref(), data)?;
        self.add_content(name, content)
    }

    /// Adds a text part. Without a content type the part carries no
    /// `Content-Type` header.
    pub fn add_string(
        &mut self,
        name: &str,
        value: &str,
        content_type: Option<&str>,
    ) -> Result<&mut Self> {
        require_name(name)?;
        self.parts.push(Part {
            name: name.to_string(),
            file_name: None,
            content_type: content_type
                .filter(|c| !c.trim().is_empty())
                .map(str::to_string),
            body: Bytes::copy_from_slice(value.as_bytes()),
        });
        Ok(self)
    }

    /// Adds one text part per key/value pair of `data`, skipping pairs whose
    /// key or value is blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConversionFailed`] if `data` yields no pairs at all.
    pub fn add_string_parts<T>(&mut self, data: &T, content_type: Option<&str>) -> Result<&mut Self>
    where
        T: Serialize + ?Sized,
    {
        let pairs = to_parameters(self.serializer.as_ref(), data)?
            .filter(|pairs| !pairs.is_empty())
            .ok_or_else(|| {
                Error::ConversionFailed("Failed to get key value pairs from post data".to_string())
            })?;

        for (key, value) in pairs {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if key.trim().is_empty() {
                continue;
            }
            self.add_string(&key, &value, content_type)?;
        }
        Ok(self)
    }

    /// Adds the pairs of `data` as one url-encoded part. `null` values are left out.
    pub fn add_url_encoded<T>(&mut self, name: &str, data: &T) -> Result<&mut Self>
    where
        T: Serialize + ?Sized,
    {
        let pairs = to_parameters(self.serializer.as_ref(), data)?.unwrap_or_default();
        let content = Content::form(
            pairs
                .into_iter()
                .filter_map(|(key, value)| value.map(|value| (key, value))),
        );
        self.add_content(name, content)
    }

    /// Encodes the parts into a single body.
    pub fn into_content(self) -> Content {
        let mut body = BytesMut::new();
        for part in &self.parts {
            body.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let mut disposition = format!(
                "Content-Disposition: form-data; name=\"{}\"",
                escape_quoted(&part.name)
            );
            if let Some(file_name) = &part.file_name {
                disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
            }
            body.put_slice(disposition.as_bytes());
            body.put_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                body.put_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.put_slice(b"\r\n");
            body.put_slice(&part.body);
            body.put_slice(b"\r\n");
        }
        body.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        Content::new(
            body.freeze(),
            format!("{}; boundary={}", self.media_type, self.boundary),
        )
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::config("Multipart part name cannot be blank"));
    }
    Ok(())
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
