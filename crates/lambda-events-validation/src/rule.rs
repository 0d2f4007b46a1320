//! Field rules and the schema-construction facility.
//!
//! A [`Rule`] describes what a single field must look like. Rules are built
//! through a [`SchemaBuilder`], which is the value handed to the closure passed
//! to [`crate::validate`], and assembled into a [`Schema`].

use regex::Regex;
use serde_json::Value;

/// Whether a field must, may, or must not be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Presence {
    /// The field may be absent.
    #[default]
    Optional,
    /// The field must be present.
    Required,
    /// The field must be absent.
    Forbidden,
}

/// The base type a rule checks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Any value.
    Any,
    /// A string.
    String,
    /// A number (integer or float).
    Number,
    /// A whole number.
    Integer,
    /// A boolean.
    Boolean,
    /// An array.
    Array,
    /// An object.
    Object,
    /// A string checked by a registered extension.
    Extension(String),
}

/// Validation rule for a single field.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) kind: RuleKind,
    pub(crate) presence: Option<Presence>,
    pub(crate) allow_null: bool,
    pub(crate) allow_empty: bool,
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) valid: Vec<Value>,
    pub(crate) items: Option<Box<Rule>>,
    pub(crate) keys: Option<Schema>,
    pub(crate) label: Option<String>,
}

impl Rule {
    /// Create a rule of the given kind with no constraints.
    #[must_use]
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            presence: None,
            allow_null: false,
            allow_empty: false,
            min: None,
            max: None,
            pattern: None,
            valid: Vec::new(),
            items: None,
            keys: None,
            label: None,
        }
    }

    /// The base type of this rule.
    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Require the field to be present.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.presence = Some(Presence::Required);
        self
    }

    /// Allow the field to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    /// Reject the field whenever it is present.
    #[must_use]
    pub fn forbidden(mut self) -> Self {
        self.presence = Some(Presence::Forbidden);
        self
    }

    /// Accept an explicit `null`.
    #[must_use]
    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Accept the empty string (strings reject it by default).
    #[must_use]
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Lower bound: string length, number value, or array length.
    #[must_use]
    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Upper bound: string length, number value, or array length.
    #[must_use]
    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Require string values to match `pattern`.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Restrict the value to one of `values`.
    #[must_use]
    pub fn valid<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.valid = values.into_iter().map(Into::into).collect();
        self
    }

    /// Rule applied to every element of an array.
    #[must_use]
    pub fn items(mut self, rule: Rule) -> Self {
        self.items = Some(Box::new(rule));
        self
    }

    /// Closed schema applied to an object value.
    #[must_use]
    pub fn keys(mut self, schema: impl Into<Schema>) -> Self {
        self.keys = Some(schema.into());
        self
    }

    /// Label used in violation messages instead of the field path.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered mapping from field name to [`Rule`].
///
/// Declaration order is kept so violations are reported in a stable order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Rule)>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field, replacing any earlier rule for the same name.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: Rule) -> Self {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = rule;
        } else {
            self.fields.push((name, rule));
        }
        self
    }

    /// Look up the rule for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declared field names, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Declared fields with their rules, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Rule)> for Schema {
    fn from_iter<T: IntoIterator<Item = (K, Rule)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |schema, (name, rule)| schema.field(name, rule))
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Rule); N]> for Schema {
    fn from(fields: [(K, Rule); N]) -> Self {
        fields.into_iter().collect()
    }
}

impl<K: Into<String>> From<Vec<(K, Rule)>> for Schema {
    fn from(fields: Vec<(K, Rule)>) -> Self {
        fields.into_iter().collect()
    }
}

/// Rule builders handed to schema-producing closures.
///
/// # Examples
///
/// ```
/// use lambda_events_validation::{Schema, SchemaBuilder};
///
/// let s = SchemaBuilder::new();
/// let schema: Schema = [
///     ("name", s.string().required()),
///     ("age", s.integer().min(0)),
/// ]
/// .into();
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rule accepting any value.
    #[must_use]
    pub fn any(&self) -> Rule {
        Rule::new(RuleKind::Any)
    }

    /// Rule for strings.
    #[must_use]
    pub fn string(&self) -> Rule {
        Rule::new(RuleKind::String)
    }

    /// Rule for numbers.
    #[must_use]
    pub fn number(&self) -> Rule {
        Rule::new(RuleKind::Number)
    }

    /// Rule for whole numbers.
    #[must_use]
    pub fn integer(&self) -> Rule {
        Rule::new(RuleKind::Integer)
    }

    /// Rule for booleans.
    #[must_use]
    pub fn boolean(&self) -> Rule {
        Rule::new(RuleKind::Boolean)
    }

    /// Rule for arrays.
    #[must_use]
    pub fn array(&self) -> Rule {
        Rule::new(RuleKind::Array)
    }

    /// Rule for objects.
    #[must_use]
    pub fn object(&self) -> Rule {
        Rule::new(RuleKind::Object)
    }

    /// Rule checked by the registered extension `name`.
    #[must_use]
    pub fn extension(&self, name: impl Into<String>) -> Rule {
        Rule::new(RuleKind::Extension(name.into()))
    }
}
