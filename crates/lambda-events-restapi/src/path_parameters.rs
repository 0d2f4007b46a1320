//! Path parameters, which gateways deliver percent-encoded.

use lambda_events_core::JsonMap;
use lambda_events_validation::{Schema, SchemaBuilder, ValidationOptions, ValidationResult};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::debug;

use crate::parameters::Parameters;

/// [`Parameters`] whose string values are percent-decoded on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParameters {
    inner: Parameters,
}

impl PathParameters {
    /// Wrap a possibly-absent map of raw (encoded) path parameters.
    #[must_use]
    pub fn new(context: Option<JsonMap>) -> Self {
        Self {
            inner: Parameters::new(context),
        }
    }

    /// Whether `key` holds a value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    /// The decoded value for `key`, or `null`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        decode(self.inner.get(key))
    }

    /// The decoded value for `key`, or `default` when absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.inner.value(key) {
            Some(value) => decode(value.clone()),
            None => default.into(),
        }
    }

    /// Look up several keys at once, decoding each; absent keys map to `null`.
    #[must_use]
    pub fn gets<I, K>(&self, keys: I) -> JsonMap
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_owned(), self.get(key))
            })
            .collect()
    }

    /// Store a raw (encoded) value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.inner.set(key, value);
        self
    }

    /// Validate the raw values against a closed schema.
    pub fn validate<F>(&self, schema_builder: F, options: ValidationOptions) -> ValidationResult
    where
        F: FnOnce(&SchemaBuilder) -> Schema,
    {
        self.inner.validate(schema_builder, options)
    }

    /// The underlying container of raw values.
    #[must_use]
    pub fn raw(&self) -> &Parameters {
        &self.inner
    }
}

/// Percent-decode non-empty strings. Everything else passes through.
///
/// Values that do not decode to UTF-8 are returned as stored.
fn decode(value: Value) -> Value {
    match value {
        Value::String(s) if !s.is_empty() => match percent_decode_str(&s).decode_utf8() {
            Ok(decoded) => Value::String(decoded.into_owned()),
            Err(e) => {
                debug!(value = %s, error = %e, "path parameter is not valid UTF-8 once decoded");
                Value::String(s)
            }
        },
        other => other,
    }
}
