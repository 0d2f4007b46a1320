//! Closed-schema validation of JSON inputs.
//!
//! Every violation is collected; validation never stops at the first one.
//! Fields that the schema does not declare are rejected unless
//! [`ValidationOptions::allow_unknown`] is set.

use std::fmt::Write as _;

use lambda_events_core::JsonMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::extensions;
use crate::rule::{Presence, Rule, RuleKind, Schema, SchemaBuilder};

/// Knobs callers may adjust.
///
/// There is deliberately no abort-early switch: consumers rely on receiving
/// the complete violation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Accept fields the schema does not declare.
    pub allow_unknown: bool,
    /// Presence applied to rules that do not set one explicitly.
    pub presence: Presence,
    /// Accept numeric and boolean strings for number and boolean rules.
    pub convert: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allow_unknown: false,
            presence: Presence::Optional,
            convert: true,
        }
    }
}

/// One rule violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDetail {
    /// Name of the offending field (last path segment).
    pub key: String,
    /// Human-readable label (rule label or full field path).
    pub label: String,
    /// The offending value, `null` when the field was absent.
    pub value: Value,
    /// Violation message.
    pub message: String,
}

/// Outcome of a validation run.
///
/// `error` is `true` exactly when `details` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    error: bool,
    details: Vec<ValidationDetail>,
}

impl ValidationResult {
    /// Build a result from collected violations.
    #[must_use]
    pub fn from_details(details: Vec<ValidationDetail>) -> Self {
        Self {
            error: !details.is_empty(),
            details,
        }
    }

    /// Whether any violation was found.
    #[must_use]
    pub fn error(&self) -> bool {
        self.error
    }

    /// Whether the input satisfied the schema.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.error
    }

    /// The violations, in discovery order.
    #[must_use]
    pub fn details(&self) -> &[ValidationDetail] {
        &self.details
    }

    /// Consume the result, returning the violations.
    #[must_use]
    pub fn into_details(self) -> Vec<ValidationDetail> {
        self.details
    }
}

/// Validate `input` against the schema produced by `schema_builder`.
///
/// # Examples
///
/// ```
/// use lambda_events_validation::{ValidationOptions, validate};
/// use serde_json::json;
///
/// let input = json!({ "name": "John" });
/// let result = validate(
///     input.as_object().expect("object"),
///     |s| [("name", s.string().required())].into(),
///     ValidationOptions::default(),
/// );
/// assert!(result.is_valid());
/// ```
pub fn validate<F>(input: &JsonMap, schema_builder: F, options: ValidationOptions) -> ValidationResult
where
    F: FnOnce(&SchemaBuilder) -> Schema,
{
    extensions::ensure_initialized();
    let schema = schema_builder(&SchemaBuilder::new());
    validate_schema(input, &schema, &options)
}

/// Validate `input` against an already-built schema.
#[must_use]
pub fn validate_schema(
    input: &JsonMap,
    schema: &Schema,
    options: &ValidationOptions,
) -> ValidationResult {
    let mut details = Vec::new();
    check_object(input, schema, &FieldPath::root(), options, &mut details);
    debug!(
        fields = schema.len(),
        violations = details.len(),
        "validated input"
    );
    ValidationResult::from_details(details)
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, Default)]
struct FieldPath(Vec<Segment>);

impl FieldPath {
    fn root() -> Self {
        Self::default()
    }

    fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    fn key(&self) -> String {
        match self.0.last() {
            Some(Segment::Key(k)) => k.clone(),
            Some(Segment::Index(i)) => i.to_string(),
            None => String::new(),
        }
    }

    fn label(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            match segment {
                Segment::Key(k) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(k);
                }
                Segment::Index(i) => {
                    let _ = write!(out, "[{i}]");
                }
            }
        }
        out
    }
}

struct Violation<'a> {
    path: &'a FieldPath,
    label: String,
    value: Value,
}

impl Violation<'_> {
    fn push(self, details: &mut Vec<ValidationDetail>, message: impl AsRef<str>) {
        details.push(ValidationDetail {
            key: self.path.key(),
            message: format!("\"{}\" {}", self.label, message.as_ref()),
            label: self.label,
            value: self.value,
        });
    }
}

fn violation<'a>(path: &'a FieldPath, rule: Option<&Rule>, value: &Value) -> Violation<'a> {
    Violation {
        path,
        label: rule
            .and_then(|r| r.label.clone())
            .unwrap_or_else(|| path.label()),
        value: value.clone(),
    }
}

fn check_object(
    map: &JsonMap,
    schema: &Schema,
    path: &FieldPath,
    options: &ValidationOptions,
    details: &mut Vec<ValidationDetail>,
) {
    for (name, rule) in schema.iter() {
        let field_path = path.child(Segment::Key(name.to_owned()));
        check_field(map.get(name), rule, &field_path, options, details);
    }

    if options.allow_unknown {
        return;
    }
    for (key, value) in map {
        if !schema.contains(key) {
            let field_path = path.child(Segment::Key(key.clone()));
            violation(&field_path, None, value).push(details, "is not allowed");
        }
    }
}

fn check_field(
    value: Option<&Value>,
    rule: &Rule,
    path: &FieldPath,
    options: &ValidationOptions,
    details: &mut Vec<ValidationDetail>,
) {
    let presence = rule.presence.unwrap_or(options.presence);
    let Some(value) = value else {
        if presence == Presence::Required {
            violation(path, Some(rule), &Value::Null).push(details, "is required");
        }
        return;
    };
    if presence == Presence::Forbidden {
        violation(path, Some(rule), value).push(details, "is not allowed");
        return;
    }
    check_value(value, rule, path, options, details);
}

fn check_value(
    value: &Value,
    rule: &Rule,
    path: &FieldPath,
    options: &ValidationOptions,
    details: &mut Vec<ValidationDetail>,
) {
    let v = || violation(path, Some(rule), value);

    if value.is_null() {
        if !(rule.allow_null || rule.kind == RuleKind::Any) {
            v().push(details, type_message(&rule.kind));
        }
        return;
    }

    if !rule.valid.is_empty() && !rule.valid.contains(value) {
        let allowed = rule
            .valid
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", ");
        v().push(details, format!("must be one of [{allowed}]"));
        return;
    }

    match &rule.kind {
        RuleKind::Any => {}
        RuleKind::String => match value.as_str() {
            Some(s) => check_string(s, rule, path, value, details),
            None => v().push(details, type_message(&rule.kind)),
        },
        RuleKind::Number | RuleKind::Integer => match as_number(value, options.convert) {
            Some(n) => check_number(n, rule, path, value, details),
            None => v().push(details, type_message(&RuleKind::Number)),
        },
        RuleKind::Boolean => {
            if as_bool(value, options.convert).is_none() {
                v().push(details, type_message(&rule.kind));
            }
        }
        RuleKind::Array => match value.as_array() {
            Some(items) => check_array(items, rule, path, value, options, details),
            None => v().push(details, type_message(&rule.kind)),
        },
        RuleKind::Object => match value.as_object() {
            Some(map) => {
                if let Some(keys) = &rule.keys {
                    check_object(map, keys, path, options, details);
                }
            }
            None => v().push(details, type_message(&rule.kind)),
        },
        RuleKind::Extension(name) => match extensions::extension(name) {
            Some(_) if !value.is_string() => v().push(details, type_message(&RuleKind::String)),
            Some(ext) if !ext.check(value) => {
                v().push(details, format!("must be {}", ext.message()));
            }
            Some(_) => {}
            None => v().push(details, format!("uses unregistered extension \"{name}\"")),
        },
    }
}

fn check_string(
    s: &str,
    rule: &Rule,
    path: &FieldPath,
    value: &Value,
    details: &mut Vec<ValidationDetail>,
) {
    let v = || violation(path, Some(rule), value);

    if s.is_empty() {
        if !rule.allow_empty {
            v().push(details, "is not allowed to be empty");
        }
        return;
    }

    let len = s.chars().count() as f64;
    if let Some(min) = rule.min.filter(|min| len < *min) {
        v().push(
            details,
            format!(
                "length must be at least {} characters long",
                display_bound(min)
            ),
        );
    }
    if let Some(max) = rule.max.filter(|max| len > *max) {
        v().push(
            details,
            format!(
                "length must be less than or equal to {} characters long",
                display_bound(max)
            ),
        );
    }
    if let Some(pattern) = rule.pattern.as_ref().filter(|p| !p.is_match(s)) {
        v().push(
            details,
            format!("with value \"{s}\" fails to match the required pattern: /{pattern}/"),
        );
    }
}

fn check_number(
    n: f64,
    rule: &Rule,
    path: &FieldPath,
    value: &Value,
    details: &mut Vec<ValidationDetail>,
) {
    let v = || violation(path, Some(rule), value);

    if rule.kind == RuleKind::Integer && n.fract() != 0.0 {
        v().push(details, "must be an integer");
    }
    if let Some(min) = rule.min.filter(|min| n < *min) {
        v().push(
            details,
            format!("must be greater than or equal to {}", display_bound(min)),
        );
    }
    if let Some(max) = rule.max.filter(|max| n > *max) {
        v().push(
            details,
            format!("must be less than or equal to {}", display_bound(max)),
        );
    }
}

fn check_array(
    items: &[Value],
    rule: &Rule,
    path: &FieldPath,
    value: &Value,
    options: &ValidationOptions,
    details: &mut Vec<ValidationDetail>,
) {
    let v = || violation(path, Some(rule), value);

    let len = items.len() as f64;
    if let Some(min) = rule.min.filter(|min| len < *min) {
        v().push(
            details,
            format!("must contain at least {} items", display_bound(min)),
        );
    }
    if let Some(max) = rule.max.filter(|max| len > *max) {
        v().push(
            details,
            format!("must contain less than or equal to {} items", display_bound(max)),
        );
    }
    if let Some(item_rule) = &rule.items {
        for (index, item) in items.iter().enumerate() {
            let item_path = path.child(Segment::Index(index));
            check_value(item, item_rule, &item_path, options, details);
        }
    }
}

fn type_message(kind: &RuleKind) -> &'static str {
    match kind {
        RuleKind::Any => "is invalid",
        RuleKind::String | RuleKind::Extension(_) => "must be a string",
        RuleKind::Number => "must be a number",
        RuleKind::Integer => "must be an integer",
        RuleKind::Boolean => "must be a boolean",
        RuleKind::Array => "must be an array",
        RuleKind::Object => "must be of type object",
    }
}

fn as_number(value: &Value, convert: bool) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if convert => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_bool(value: &Value, convert: bool) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if convert => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn display_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        (bound as i64).to_string()
    } else {
        bound.to_string()
    }
}
