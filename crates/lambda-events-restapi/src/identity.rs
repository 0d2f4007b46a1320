//! Caller identity resolution from the gateway's authorizer context.
//!
//! Resolution is split into a pure planning step ([`IdentitySource::from_context`])
//! that inspects the request context, and an async step that consults a
//! [`UserDirectory`] when the caller authenticated through Cognito IAM.

use lambda_events_core::{JsonMap, LookupFailurePolicy};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::directory::{DirectoryUser, UserDirectory};
use crate::error::IdentityError;
use crate::event::{Payload, RequestContext};

const AUTHENTICATED: &str = "authenticated";
const DEFAULT_IDENTITY_TAG: &str = "default";

static IAM_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.-]*/([\w-]*):CognitoSignIn:([\w-]*)").expect("valid IAM reference pattern")
});

static PROVIDER_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*,[\w.-]*/([\w-]*):CognitoSignIn:([\w-]*)")
        .expect("valid provider reference pattern")
});

/// A resolved caller identity: a flat map of attributes.
///
/// Always carries `username`. Identities from token claims also carry
/// `identity`; identities from a directory carry `enabled`, `status`, and
/// every directory attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Identity(JsonMap);

impl Identity {
    /// The caller's user name, if it is a string.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }

    /// Borrow an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow all attributes.
    #[must_use]
    pub fn as_map(&self) -> &JsonMap {
        &self.0
    }

    /// Take the attribute map.
    #[must_use]
    pub fn into_inner(self) -> JsonMap {
        self.0
    }

    fn from_claims(mut claims: JsonMap, tag: Value) -> Self {
        claims.insert("identity".to_owned(), tag);
        let username = [claims.get("cognito:username"), claims.get("sub")]
            .into_iter()
            .flatten()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null);
        claims.insert("username".to_owned(), username);
        Self(claims)
    }

    fn from_directory(user: DirectoryUser) -> Self {
        let mut map = JsonMap::new();
        map.insert("username".to_owned(), Value::String(user.username));
        map.insert("enabled".to_owned(), Value::Bool(user.enabled));
        map.insert(
            "status".to_owned(),
            user.status.map_or(Value::Null, Value::String),
        );
        for (name, value) in user.attributes {
            map.insert(name, Value::String(value));
        }
        Self(map)
    }
}

impl From<Identity> for Value {
    fn from(identity: Identity) -> Self {
        Value::Object(identity.0)
    }
}

/// The user pool and subject named by a Cognito sign-in reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInReference {
    /// User pool identifier.
    pub pool_id: String,
    /// Subject identifier.
    pub sub: String,
}

impl SignInReference {
    /// Parse the third AMR entry: `<prefix>/<poolId>:CognitoSignIn:<sub>`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MalformedProvider`] if `reference` does not
    /// match.
    pub fn parse_amr(reference: &str) -> Result<Self, IdentityError> {
        Self::capture(&IAM_REFERENCE, reference)
    }

    /// Parse a legacy provider string:
    /// `<poolRef>,<prefix>/<poolId>:CognitoSignIn:<sub>`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MalformedProvider`] if `provider` does not
    /// match.
    pub fn parse_provider(provider: &str) -> Result<Self, IdentityError> {
        Self::capture(&PROVIDER_REFERENCE, provider)
    }

    fn capture(pattern: &Regex, input: &str) -> Result<Self, IdentityError> {
        let caps = pattern
            .captures(input)
            .ok_or_else(|| IdentityError::MalformedProvider(input.to_owned()))?;
        Ok(Self {
            pool_id: caps[1].to_owned(),
            sub: caps[2].to_owned(),
        })
    }
}

/// Where a caller's identity comes from, decided from the request context alone.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentitySource {
    /// No authenticated caller.
    Anonymous,
    /// Token claims; no remote lookup needed.
    Claims(Identity),
    /// A Cognito subject that must be looked up in a directory.
    Directory(SignInReference),
}

impl IdentitySource {
    /// Inspect the authorizer context.
    ///
    /// Claims take precedence over the IAM descriptor, which takes precedence
    /// over the legacy caller identity block.
    ///
    /// # Errors
    ///
    /// Returns an error if claims are a string that is not a JSON object, or
    /// if an authenticated caller carries an unrecognized sign-in reference.
    pub fn from_context(context: Option<&RequestContext>) -> Result<Self, IdentityError> {
        let Some(context) = context else {
            return Ok(Self::Anonymous);
        };
        let authorizer = context.authorizer.as_ref();

        if let Some(claims) = authorizer.and_then(|a| a.claims.as_ref()) {
            if let Some(claims) = decode_claims(claims)? {
                let tag = authorizer
                    .and_then(|a| a.identity.clone())
                    .filter(|v| !v.is_null())
                    .unwrap_or_else(|| Value::String(DEFAULT_IDENTITY_TAG.to_owned()));
                return Ok(Self::Claims(Identity::from_claims(claims, tag)));
            }
        }

        if let Some(iam) = authorizer.and_then(|a| a.iam.as_ref()) {
            let amr = iam
                .cognito_identity
                .as_ref()
                .map(|c| c.amr.as_slice())
                .unwrap_or_default();
            if amr.first().map(String::as_str) != Some(AUTHENTICATED) {
                debug!("IAM caller is not authenticated");
                return Ok(Self::Anonymous);
            }
            let reference = amr.get(2).map_or("", String::as_str);
            return SignInReference::parse_amr(reference).map(Self::Directory);
        }

        if let Some(identity) = &context.identity {
            if identity.cognito_authentication_type.as_deref() != Some(AUTHENTICATED) {
                return Ok(Self::Anonymous);
            }
            let provider = identity
                .cognito_authentication_provider
                .as_deref()
                .unwrap_or_default();
            return SignInReference::parse_provider(provider).map(Self::Directory);
        }

        Ok(Self::Anonymous)
    }
}

/// Decode claims into a map. Empty claims (`""`, `null`) count as absent.
fn decode_claims(claims: &Payload) -> Result<Option<JsonMap>, IdentityError> {
    match claims {
        Payload::Decoded(map) => Ok(Some(map.clone())),
        Payload::Encoded(s) if s.is_empty() => Ok(None),
        Payload::Encoded(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => Err(IdentityError::MalformedClaims(format!(
                "expected an object, got {other}"
            ))),
            Err(e) => Err(IdentityError::MalformedClaims(e.to_string())),
        },
        Payload::Other(Value::Null) => Ok(None),
        Payload::Other(other) => Err(IdentityError::MalformedClaims(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Look up `reference` in `directory`, taking the first matching user.
///
/// A failed lookup or an empty match is handled per `policy`: `Anonymous`
/// logs and yields `Ok(None)`, `Error` surfaces the failure.
///
/// # Errors
///
/// With [`LookupFailurePolicy::Error`], returns
/// [`IdentityError::Directory`] or [`IdentityError::UserNotFound`].
pub async fn lookup(
    directory: &dyn UserDirectory,
    reference: &SignInReference,
    policy: LookupFailurePolicy,
) -> Result<Option<Identity>, IdentityError> {
    let SignInReference { pool_id, sub } = reference;
    let error = match directory.find_users_by_sub(pool_id, sub).await {
        Ok(users) => match users.into_iter().next() {
            Some(user) => {
                debug!(pool_id, sub, username = %user.username, "resolved directory user");
                return Ok(Some(Identity::from_directory(user)));
            }
            None => IdentityError::UserNotFound {
                pool_id: pool_id.clone(),
                sub: sub.clone(),
            },
        },
        Err(e) => IdentityError::from(e),
    };

    match policy {
        LookupFailurePolicy::Anonymous => {
            warn!(pool_id, sub, error = %error, "identity lookup failed, treating caller as anonymous");
            Ok(None)
        }
        LookupFailurePolicy::Error => Err(error),
    }
}
