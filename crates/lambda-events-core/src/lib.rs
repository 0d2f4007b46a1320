//! Core types, configuration, and error handling for lambda-events.
//!
//! This crate provides the building blocks shared by the validation and
//! REST API crates: environment-driven configuration, the shared error type,
//! and the JSON map alias every parameter source is expressed in.

mod config;
mod error;
mod types;

pub use config::{
    DEFAULT_MULTIPART_MAX_BYTES, DEFAULT_MULTIPART_MAX_FIELD_BYTES, LambdaEventsConfig,
    LookupFailurePolicy,
};
pub use error::LambdaEventsError;
pub use types::{AwsRegion, JsonMap};
