//! Shared type definitions.

use std::fmt;

/// A JSON object keyed by field name.
///
/// Every parameter source of a gateway event (headers, path, query, body) and
/// every resolved identity is represented as one of these. Keys keep the
/// order they arrived in.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// AWS Region identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Region used when neither `AWS_REGION` nor `DEFAULT_REGION` is set.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
