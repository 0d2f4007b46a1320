//! Error types for event normalization.
//!
//! Malformed JSON bodies and validation failures are not errors: the former
//! yield an empty body container and the latter a [`ValidationResult`].
//!
//! [`ValidationResult`]: lambda_events_validation::ValidationResult

/// The raw event could not be mapped onto the typed event model.
#[derive(Debug, thiserror::Error)]
#[error("invalid gateway event: {0}")]
pub struct EventError(#[from] pub serde_json::Error);

/// Errors raised while decoding a `multipart/form-data` body.
///
/// Cloneable so that a failed decode can be reported again to every later
/// caller of [`crate::Request::file`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// The request content type is not `multipart/form-data`.
    #[error("Unsupported content type: {0}")]
    NotMultipart(String),

    /// The content type carries no usable `boundary` parameter.
    #[error("Multipart: Boundary not found")]
    MissingBoundary,

    /// The body is flagged as base64 but does not decode.
    #[error("Invalid base64 body: {0}")]
    InvalidEncoding(String),

    /// The buffered body exceeds the configured limit.
    #[error("Body of {size} bytes exceeds the {limit} byte limit")]
    BodyTooLarge {
        /// Body size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A plain text field exceeds the configured limit.
    #[error("Field \"{name}\" exceeds the {limit} byte limit")]
    FieldTooLarge {
        /// Field name.
        name: String,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A part's header section is unreasonably long.
    #[error("Malformed part header: header section exceeds {0} bytes")]
    HeaderTooLarge(usize),

    /// The body does not follow the multipart framing.
    #[error("Malformed multipart body: {0}")]
    Malformed(String),

    /// Input ended before the closing boundary.
    #[error("Unexpected end of form")]
    UnexpectedEnd,

    /// The body reader failed.
    #[error("Failed to read multipart body: {0}")]
    Read(String),
}

/// Errors raised by a [`crate::UserDirectory`] backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// The backing service failed or could not be reached.
    #[error("directory service error: {0}")]
    Service(String),
}

/// Errors raised while resolving the caller identity.
///
/// Anonymous callers are not errors; they resolve to `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Token claims arrived as a string that is not a JSON object.
    #[error("authorizer claims are not a JSON object: {0}")]
    MalformedClaims(String),

    /// An authenticated provider reference does not match the Cognito sign-in format.
    #[error("unrecognized Cognito sign-in reference: {0}")]
    MalformedProvider(String),

    /// The directory holds no user with the authenticated subject.
    #[error("no user with sub {sub} in user pool {pool_id}")]
    UserNotFound {
        /// User pool identifier.
        pool_id: String,
        /// Subject identifier.
        sub: String,
    },

    /// The directory lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
