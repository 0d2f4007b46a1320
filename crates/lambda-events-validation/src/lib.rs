//! Declarative closed-schema validation for lambda-events.
//!
//! A caller supplies a closure that receives a [`SchemaBuilder`] and returns a
//! [`Schema`], a mapping from field name to [`Rule`]. The input is checked
//! against exactly those fields: anything undeclared is reported as not
//! allowed, and every violation is collected into a [`ValidationResult`].
//!
//! # Usage
//!
//! ```rust
//! use lambda_events_validation::{ValidationOptions, validate};
//! use serde_json::json;
//!
//! let input = json!({ "name": "John", "description": "x" });
//! let result = validate(
//!     input.as_object().expect("object"),
//!     |s| [("name", s.string().required())].into(),
//!     ValidationOptions::default(),
//! );
//! assert!(result.error());
//! assert_eq!(result.details()[0].key, "description");
//! ```
//!
//! # Modules
//!
//! - [`extensions`] - Process-wide registry of named custom rules
//! - [`rule`] - Rules, schemas and the schema-construction facility
//! - [`validator`] - The validation engine and its result shape

pub mod extensions;
pub mod rule;
pub mod validator;

pub use extensions::{Extension, ensure_initialized, install_extensions};
pub use rule::{Presence, Rule, RuleKind, Schema, SchemaBuilder};
pub use validator::{
    ValidationDetail, ValidationOptions, ValidationResult, validate, validate_schema,
};
