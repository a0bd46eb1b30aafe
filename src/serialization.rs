//! Pluggable JSON serialization.
//!
//! Everything that turns values into JSON text (request bodies, query and form
//! parameters) or JSON text back into values goes through a [`JsonSerializer`].
//! A request picks its serializer up from [`SerializerRegistry::global`] when it
//! is created; callers that need a different one per request pass it explicitly
//! with [`RestRequest::with_serializer`](crate::RestRequest::with_serializer).

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Converts between JSON text and [`serde_json::Value`].
///
/// Implementations must be cheap to share; the registry hands them out as
/// `Arc<dyn JsonSerializer>`.
pub trait JsonSerializer: Send + Sync + fmt::Debug {
    /// The name the serializer is registered under.
    fn name(&self) -> &str;

    /// Writes a value as JSON text.
    fn write(&self, value: &Value) -> serde_json::Result<String>;

    /// Parses JSON text.
    fn read(&self, text: &str) -> serde_json::Result<Value>;
}

/// Compact JSON with no insignificant whitespace. The baseline serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactJson;

impl JsonSerializer for CompactJson {
    fn name(&self) -> &str {
        "compact"
    }

    fn write(&self, value: &Value) -> serde_json::Result<String> {
        serde_json::to_string(value)
    }

    fn read(&self, text: &str) -> serde_json::Result<Value> {
        serde_json::from_str(text)
    }
}

/// Indented JSON, handy when request bodies end up in logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJson;

impl JsonSerializer for PrettyJson {
    fn name(&self) -> &str {
        "pretty"
    }

    fn write(&self, value: &Value) -> serde_json::Result<String> {
        serde_json::to_string_pretty(value)
    }

    fn read(&self, text: &str) -> serde_json::Result<Value> {
        serde_json::from_str(text)
    }
}

/// Process-wide serializer configuration.
///
/// Holds the current default serializer plus a table of named serializers it
/// can be switched to. [`reset`](Self::reset) restores [`CompactJson`].
///
/// # Examples
///
/// ```
/// use restwright::serialization::{PrettyJson, SerializerRegistry};
///
/// let registry = SerializerRegistry::new();
/// registry.use_type::<PrettyJson>();
/// assert_eq!(registry.current().name(), "pretty");
///
/// registry.reset();
/// assert_eq!(registry.current().name(), "compact");
/// ```
#[derive(Debug)]
pub struct SerializerRegistry {
    current: RwLock<Arc<dyn JsonSerializer>>,
    named: RwLock<HashMap<String, Arc<dyn JsonSerializer>>>,
}

static GLOBAL_REGISTRY: Lazy<SerializerRegistry> = Lazy::new(SerializerRegistry::new);

impl SerializerRegistry {
    /// Creates a registry with the built-in serializers registered and
    /// [`CompactJson`] selected.
    pub fn new() -> Self {
        let registry = Self {
            current: RwLock::new(Arc::new(CompactJson)),
            named: RwLock::new(HashMap::new()),
        };
        registry.register(Arc::new(CompactJson));
        registry.register(Arc::new(PrettyJson));
        registry
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static SerializerRegistry {
        &GLOBAL_REGISTRY
    }

    /// The serializer currently selected.
    pub fn current(&self) -> Arc<dyn JsonSerializer> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Selects `serializer` as the default.
    pub fn set(&self, serializer: Arc<dyn JsonSerializer>) {
        tracing::debug!(serializer = serializer.name(), "Default JSON serializer changed");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = serializer;
    }

    /// Makes `serializer` selectable by its name. Replaces any serializer
    /// registered under the same name.
    pub fn register(&self, serializer: Arc<dyn JsonSerializer>) {
        self.named
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(serializer.name().to_string(), serializer);
    }

    /// Selects a previously registered serializer by name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if nothing is registered under `name`.
    pub fn use_named(&self, name: &str) -> Result<()> {
        let serializer = self
            .named
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("No JSON serializer named '{}'", name)))?;
        self.set(serializer);
        Ok(())
    }

    /// Selects a fresh instance of `S` as the default.
    pub fn use_type<S>(&self)
    where
        S: JsonSerializer + Default + 'static,
    {
        tracing::trace!(serializer_type = type_name::<S>(), "Selecting JSON serializer by type");
        self.set(Arc::new(S::default()));
    }

    /// Restores [`CompactJson`] as the default.
    pub fn reset(&self) {
        self.set(Arc::new(CompactJson));
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes `value` to JSON text.
pub fn to_json_string<T>(serializer: &dyn JsonSerializer, value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|e| Error::SerializationFailed(e.to_string()))?;
    serializer
        .write(&value)
        .map_err(|e| Error::SerializationFailed(e.to_string()))
}

/// Key/value pairs extracted from a value. `None` marks a `null` entry.
pub type Parameters = Vec<(String, Option<String>)>;

/// Turns a value into ordered key/value pairs through a JSON round trip.
///
/// Accepted shapes are JSON objects (structs, maps) and sequences of
/// two-element `[key, value]` arrays (`Vec<(K, V)>`). Strings are taken as-is,
/// other scalars use their JSON text, `null` becomes `None`. Returns
/// `Ok(None)` for a `null` input.
///
/// # Errors
///
/// Returns [`Error::ConversionFailed`] for any other shape.
///
/// # Examples
///
/// ```
/// use restwright::serialization::{to_parameters, CompactJson};
/// use serde_json::json;
///
/// let pairs = to_parameters(&CompactJson, &json!({ "page": 2, "q": "rust", "tag": null }))
///     .unwrap()
///     .unwrap();
/// assert_eq!(
///     pairs,
///     vec![
///         ("page".to_string(), Some("2".to_string())),
///         ("q".to_string(), Some("rust".to_string())),
///         ("tag".to_string(), None),
///     ]
/// );
/// ```
pub fn to_parameters<T>(serializer: &dyn JsonSerializer, value: &T) -> Result<Option<Parameters>>
where
    T: Serialize + ?Sized,
{
    let text = to_json_string(serializer, value)?;
    let value = serializer
        .read(&text)
        .map_err(|e| Error::ConversionFailed(e.to_string()))?;

    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(
            map.into_iter()
                .map(|(key, value)| (key, scalar_text(value)))
                .collect(),
        )),
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::Array(mut pair) if pair.len() == 2 => {
                    let value = pair.pop().and_then(scalar_text);
                    match pair.pop() {
                        Some(Value::String(key)) => Ok((key, value)),
                        other => Err(Error::ConversionFailed(format!(
                            "parameter key must be a string, got {:?}",
                            other
                        ))),
                    }
                }
                other => Err(Error::ConversionFailed(format!(
                    "expected a [key, value] pair, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        other => Err(Error::ConversionFailed(format!(
            "cannot read key/value pairs from {}",
            other
        ))),
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
