//! Typed model of an API Gateway REST proxy event.
//!
//! Only the members this crate consumes are modelled; unrecognized fields are
//! ignored during deserialization.

use lambda_events_core::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;

/// A member that gateways deliver either JSON-encoded or already decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// A string, usually JSON-encoded (or multipart, or base64).
    Encoded(String),
    /// An already-decoded JSON object.
    Decoded(JsonMap),
    /// Any other JSON value (arrays, numbers, booleans).
    Other(Value),
}

/// The inbound gateway event for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    /// Request headers.
    pub headers: Option<JsonMap>,
    /// Path parameters, percent-encoded.
    pub path_parameters: Option<JsonMap>,
    /// Query string parameters.
    pub query_string_parameters: Option<JsonMap>,
    /// Request body.
    pub body: Option<Payload>,
    /// Whether a string body is base64-encoded.
    pub is_base64_encoded: bool,
    /// Authorization and caller metadata attached by the gateway.
    pub request_context: Option<RequestContext>,
}

impl RawEvent {
    /// Build an event from an untyped JSON value.
    ///
    /// # Errors
    ///
    /// Returns an [`EventError`] if a recognized member has the wrong shape,
    /// for example `headers` being a string.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// The `requestContext` member of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContext {
    /// Authorizer output (token claims or IAM descriptor).
    pub authorizer: Option<Authorizer>,
    /// Legacy caller identity block.
    pub identity: Option<CallerIdentity>,
}

/// The `requestContext.authorizer` member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Authorizer {
    /// Verified token claims.
    pub claims: Option<Payload>,
    /// Authorizer-supplied identity tag.
    pub identity: Option<Value>,
    /// IAM authorizer descriptor.
    pub iam: Option<IamAuthorizer>,
}

/// The `requestContext.authorizer.iam` member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IamAuthorizer {
    /// Cognito identity pool descriptor.
    pub cognito_identity: Option<CognitoIdentity>,
}

/// The `requestContext.authorizer.iam.cognitoIdentity` member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CognitoIdentity {
    /// Authentication method references: `[authState, poolRef, signInRef]`.
    pub amr: Vec<String>,
}

/// The `requestContext.identity` member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallerIdentity {
    /// `authenticated` or `unauthenticated`.
    pub cognito_authentication_type: Option<String>,
    /// `<poolRef>,<prefix>/<poolId>:CognitoSignIn:<sub>`.
    pub cognito_authentication_provider: Option<String>,
}
