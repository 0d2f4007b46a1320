//! Key/value container over one parameter source of an event.

use lambda_events_core::JsonMap;
use lambda_events_validation::{Schema, SchemaBuilder, ValidationOptions, ValidationResult};
use serde_json::Value;

/// A parameter source (headers, query string, body) of a gateway event.
///
/// The backing map may be absent; an absent map behaves exactly like an
/// empty one for every read. [`Parameters::set`] allocates the map on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    context: Option<JsonMap>,
}

impl Parameters {
    /// Wrap a possibly-absent map.
    #[must_use]
    pub fn new(context: Option<JsonMap>) -> Self {
        Self { context }
    }

    /// Whether `key` holds a value. A stored `null` counts as present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Borrow the stored value for `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.context.as_ref().and_then(|map| map.get(key))
    }

    /// Borrow the stored value for `key` if it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    /// The stored value for `key`, or `null`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.get_or(key, Value::Null)
    }

    /// The stored value for `key`, or `default` when absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.value(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Look up several keys at once; absent keys map to `null`.
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

    /// Store `value` at `key`, allocating the backing map if needed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.context
            .get_or_insert_with(JsonMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Validate the backing map (or an empty map) against a closed schema.
    pub fn validate<F>(&self, schema_builder: F, options: ValidationOptions) -> ValidationResult
    where
        F: FnOnce(&SchemaBuilder) -> Schema,
    {
        match &self.context {
            Some(map) => lambda_events_validation::validate(map, schema_builder, options),
            None => lambda_events_validation::validate(&JsonMap::new(), schema_builder, options),
        }
    }

    /// Borrow the backing map, if one exists.
    #[must_use]
    pub fn as_map(&self) -> Option<&JsonMap> {
        self.context.as_ref()
    }

    /// Iterate over stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.context
            .iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.context.as_ref().map_or(0, JsonMap::len)
    }

    /// Whether no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<JsonMap> for Parameters {
    fn from(map: JsonMap) -> Self {
        Self::new(Some(map))
    }
}

impl From<Option<JsonMap>> for Parameters {
    fn from(map: Option<JsonMap>) -> Self {
        Self::new(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => Parameters::from(map),
            _ => panic!("test input must be an object"),
        }
    }

    #[test]
    fn test_should_report_present_keys() {
        let parameters = params(json!({ "search": "hello", "name": "John", "age": null }));
        assert!(parameters.has("search"));
        assert!(parameters.has("name"));
        assert!(parameters.has("age"));
        assert!(!parameters.has("xxx"));
    }

    #[test]
    fn test_should_get_several_keys() {
        let parameters = params(json!({ "name": "John", "age": null, "query": "value" }));
        let expected = json!({ "name": "John", "age": null, "query": "value", "missing": null });
        assert_eq!(
            Value::Object(parameters.gets(["name", "age", "query", "missing"])),
            expected
        );
    }

    #[test]
    fn test_should_keep_event_key_order() {
        let mut parameters = params(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
        parameters.set("beta", 4);
        assert_eq!(
            parameters.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid", "beta"]
        );
    }

    #[test]
    fn test_should_get_with_default() {
        let parameters = params(json!({ "search": "value", "empty": null }));
        assert_eq!(parameters.get("search"), json!("value"));
        assert_eq!(parameters.get_or("keyword", "nodejs"), json!("nodejs"));
        assert_eq!(parameters.get("keyword"), Value::Null);
        assert_eq!(parameters.get_or("empty", "fallback"), Value::Null);
        assert_eq!(parameters.get_str("search"), Some("value"));
    }

    #[test]
    fn test_should_set_value() {
        let mut parameters = params(json!({ "search": "value" }));
        parameters.set("search", "value2");
        assert_eq!(parameters, params(json!({ "search": "value2" })));
        assert_eq!(parameters.get("search"), json!("value2"));
    }

    #[test]
    fn test_should_allocate_on_set_when_absent() {
        let mut parameters = Parameters::default();
        assert!(parameters.is_empty());
        assert!(parameters.as_map().is_none());
        parameters.set("name", "John").set("age", 30);
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters.get("age"), json!(30));
    }

    #[test]
    fn test_should_read_absent_source_as_empty() {
        let parameters = Parameters::new(None);
        assert!(!parameters.has("anything"));
        assert_eq!(parameters.get_or("anything", 1), json!(1));
        assert_eq!(parameters.keys().count(), 0);
    }

    #[test]
    fn test_should_validate_backing_map() {
        let parameters = params(json!({ "name": "John", "description": "This is a John" }));
        let result = parameters.validate(
            |s| {
                [
                    ("name", s.string().required()),
                    ("description", s.string().required()),
                ]
                .into()
            },
            ValidationOptions::default(),
        );
        assert!(!result.error());
        assert!(result.details().is_empty());
    }

    #[test]
    fn test_should_validate_absent_source_as_empty_map() {
        let result = Parameters::new(None).validate(
            |s| [("name", s.string().required())].into(),
            ValidationOptions::default(),
        );
        assert!(result.error());
        assert_eq!(result.details()[0].key, "name");
    }
}
