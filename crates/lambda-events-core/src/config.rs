//! Configuration management for lambda-events.
//!
//! All configuration is driven by environment variables, which is how Lambda
//! functions receive their settings.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::LambdaEventsError;
use crate::types::AwsRegion;

/// Default upper bound for a buffered multipart body (API Gateway's payload limit).
pub const DEFAULT_MULTIPART_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Default upper bound for one plain multipart text field.
pub const DEFAULT_MULTIPART_MAX_FIELD_BYTES: usize = 1024 * 1024;

/// What the identity resolver does when a directory lookup fails or finds no user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupFailurePolicy {
    /// Log the failure and treat the caller as anonymous.
    #[default]
    Anonymous,
    /// Surface the failure to the caller as an error.
    Error,
}

impl LookupFailurePolicy {
    /// Returns the policy name as used in `IDENTITY_LOOKUP_FAILURE`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LookupFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupFailurePolicy {
    type Err = LambdaEventsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "null" | "degrade" => Ok(Self::Anonymous),
            "error" | "fail" | "strict" => Ok(Self::Error),
            other => Err(LambdaEventsError::Config(format!(
                "unknown identity lookup failure policy: {other}"
            ))),
        }
    }
}

/// Global configuration for lambda-events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaEventsConfig {
    /// Region used when a directory client has to be built lazily.
    pub default_region: AwsRegion,
    /// Log level for hosts that install a tracing subscriber.
    pub log_level: String,
    /// Directory lookup failure policy.
    pub lookup_failure: LookupFailurePolicy,
    /// Maximum size of a buffered multipart body, in bytes.
    pub multipart_max_bytes: usize,
    /// Maximum size of a single multipart text field, in bytes.
    pub multipart_max_field_bytes: usize,
}

impl Default for LambdaEventsConfig {
    fn default() -> Self {
        Self {
            default_region: AwsRegion::default(),
            log_level: "info".to_owned(),
            lookup_failure: LookupFailurePolicy::default(),
            multipart_max_bytes: DEFAULT_MULTIPART_MAX_BYTES,
            multipart_max_field_bytes: DEFAULT_MULTIPART_MAX_FIELD_BYTES,
        }
    }
}

impl LambdaEventsConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("AWS_REGION").or_else(|| lookup("DEFAULT_REGION")) {
            config.default_region = AwsRegion::new(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("IDENTITY_LOOKUP_FAILURE") {
            match v.parse() {
                Ok(policy) => config.lookup_failure = policy,
                Err(e) => warn!(error = %e, "ignoring IDENTITY_LOOKUP_FAILURE"),
            }
        }
        if let Some(v) = lookup("MULTIPART_MAX_BYTES") {
            config.multipart_max_bytes = parse_size("MULTIPART_MAX_BYTES", &v)
                .unwrap_or(DEFAULT_MULTIPART_MAX_BYTES);
        }
        if let Some(v) = lookup("MULTIPART_MAX_FIELD_BYTES") {
            config.multipart_max_field_bytes = parse_size("MULTIPART_MAX_FIELD_BYTES", &v)
                .unwrap_or(DEFAULT_MULTIPART_MAX_FIELD_BYTES);
        }

        config
    }
}

fn parse_size(key: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(key, value, "invalid size, using default");
            None
        }
    }
}
