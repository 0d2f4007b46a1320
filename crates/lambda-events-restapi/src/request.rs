//! The request normalizer: one gateway event, four parameter containers.
//!
//! [`Request`] splits a [`RawEvent`] into header, path, query and body
//! containers, decodes the body once at construction, and exposes the merged
//! input view used by handlers. Multipart bodies are decoded lazily on the
//! first [`Request::file`] call; caller identity is resolved on demand by
//! [`Request::user`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lambda_events_core::{JsonMap, LambdaEventsConfig};
use lambda_events_validation::{Schema, SchemaBuilder, ValidationOptions, ValidationResult};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::directory::{CognitoUserDirectory, UserDirectory};
use crate::error::{EventError, IdentityError, MultipartError};
use crate::event::{Payload, RawEvent, RequestContext};
use crate::identity::{self, Identity, IdentitySource};
use crate::multipart::{self, FilePart, FormCollector};
use crate::parameters::Parameters;
use crate::path_parameters::PathParameters;

/// Progress of the one-shot multipart decode.
#[derive(Debug, Clone)]
enum MultipartState {
    NotStarted,
    Decoded,
    Failed(MultipartError),
}

/// A normalized API Gateway REST request.
#[derive(Debug)]
pub struct Request {
    headers: Parameters,
    parameters: PathParameters,
    queries: Parameters,
    body: Parameters,
    raw_body: Option<String>,
    is_base64_encoded: bool,
    request_context: Option<RequestContext>,
    config: LambdaEventsConfig,
    directory: OnceCell<Arc<dyn UserDirectory>>,
    multipart: MultipartState,
    files: HashMap<String, FilePart>,
}

impl Request {
    /// Normalize `event` with the default configuration.
    #[must_use]
    pub fn new(event: RawEvent) -> Self {
        Self::with_config(event, LambdaEventsConfig::default())
    }

    /// Normalize `event` with an explicit configuration.
    #[must_use]
    pub fn with_config(event: RawEvent, config: LambdaEventsConfig) -> Self {
        lambda_events_validation::ensure_initialized();

        let headers = Parameters::new(event.headers);
        let content_type = header_value(&headers, "content-type").unwrap_or_default();
        let is_multipart = multipart::is_multipart(content_type);

        let (body, raw_body) = match event.body {
            Some(Payload::Encoded(raw)) if is_multipart => (Parameters::default(), Some(raw)),
            Some(Payload::Encoded(raw)) => (decode_json_body(&raw, event.is_base64_encoded), None),
            Some(Payload::Decoded(map)) => (Parameters::from(map), None),
            Some(Payload::Other(Value::Null)) | None => (Parameters::default(), None),
            Some(Payload::Other(other)) => {
                debug!(body = %other, "ignoring non-object body");
                (Parameters::default(), None)
            }
        };

        Self {
            headers,
            parameters: PathParameters::new(event.path_parameters),
            queries: Parameters::new(event.query_string_parameters),
            body,
            raw_body,
            is_base64_encoded: event.is_base64_encoded,
            request_context: event.request_context,
            config,
            directory: OnceCell::new(),
            multipart: MultipartState::NotStarted,
            files: HashMap::new(),
        }
    }

    /// Normalize an untyped JSON event.
    ///
    /// # Errors
    ///
    /// Returns an [`EventError`] if a recognized member has the wrong shape.
    pub fn from_value(event: Value) -> Result<Self, EventError> {
        Ok(Self::new(RawEvent::from_value(event)?))
    }

    /// Use `directory` for identity lookups instead of a lazily built
    /// Cognito client.
    #[must_use]
    pub fn with_directory(self, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            directory: OnceCell::new_with(Some(directory)),
            ..self
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LambdaEventsConfig {
        &self.config
    }

    /// Header container.
    #[must_use]
    pub fn headers(&self) -> &Parameters {
        &self.headers
    }

    /// Path parameter container.
    #[must_use]
    pub fn parameters(&self) -> &PathParameters {
        &self.parameters
    }

    /// Query string container.
    #[must_use]
    pub fn queries(&self) -> &Parameters {
        &self.queries
    }

    /// Body container.
    #[must_use]
    pub fn body(&self) -> &Parameters {
        &self.body
    }

    /// Mutable body container.
    pub fn body_mut(&mut self) -> &mut Parameters {
        &mut self.body
    }

    /// The request context, if the gateway attached one.
    #[must_use]
    pub fn request_context(&self) -> Option<&RequestContext> {
        self.request_context.as_ref()
    }

    /// Header value for `key`; an exact match wins over a case-insensitive one.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        header_value(&self.headers, key)
    }

    /// Percent-decoded path parameter, or `null`.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Value {
        self.parameters.get(key)
    }

    /// Query string value, or `null`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.queries.get(key)
    }

    /// Query string value, or `default`.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.queries.get_or(key, default)
    }

    /// Body value, then query value, or `null`.
    #[must_use]
    pub fn input(&self, key: &str) -> Value {
        self.input_or(key, Value::Null)
    }

    /// Body value, then query value, or `default`.
    #[must_use]
    pub fn input_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.body
            .value(key)
            .or_else(|| self.queries.value(key))
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    /// Merged values for `keys`. A `null` body value yields to the query value.
    #[must_use]
    pub fn inputs<I, K>(&self, keys: I) -> JsonMap
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_owned(), self.merged(key).cloned().unwrap_or(Value::Null))
            })
            .collect()
    }

    /// Whether the query string or the body holds `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.queries.has(key) || self.body.has(key)
    }

    /// Validate the merged input view against a closed schema.
    ///
    /// The view holds every query and body key; keys present in neither stay
    /// absent so that required-field rules fire.
    pub fn validate<F>(&self, schema_builder: F, options: ValidationOptions) -> ValidationResult
    where
        F: FnOnce(&SchemaBuilder) -> Schema,
    {
        let view: JsonMap = self
            .queries
            .keys()
            .chain(self.body.keys())
            .filter_map(|key| self.merged(key).map(|v| (key.to_owned(), v.clone())))
            .collect();
        lambda_events_validation::validate(&view, schema_builder, options)
    }

    /// Merged lookup: non-null body value, else query value, else a body `null`.
    fn merged(&self, key: &str) -> Option<&Value> {
        match self.body.value(key) {
            Some(v) if !v.is_null() => Some(v),
            body => self.queries.value(key).or(body),
        }
    }

    /// Resolve the caller identity.
    ///
    /// Returns `Ok(None)` for anonymous callers. A Cognito client is built
    /// from the ambient AWS configuration on the first lookup unless a
    /// directory was injected with [`Request::with_directory`].
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] for malformed claims or sign-in
    /// references, and for failed lookups under
    /// [`LookupFailurePolicy::Error`](lambda_events_core::LookupFailurePolicy::Error).
    pub async fn user(&self) -> Result<Option<Identity>, IdentityError> {
        match IdentitySource::from_context(self.request_context.as_ref())? {
            IdentitySource::Anonymous => Ok(None),
            IdentitySource::Claims(identity) => Ok(Some(identity)),
            IdentitySource::Directory(reference) => {
                let directory = self
                    .directory
                    .get_or_init(|| async {
                        debug!(region = %self.config.default_region, "building Cognito directory client");
                        let directory: Arc<dyn UserDirectory> = Arc::new(
                            CognitoUserDirectory::from_env(&self.config.default_region).await,
                        );
                        directory
                    })
                    .await;
                identity::lookup(directory.as_ref(), &reference, self.config.lookup_failure).await
            }
        }
    }

    /// Whether the request declares a `multipart/form-data` body.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.header("content-type")
            .is_some_and(multipart::is_multipart)
    }

    /// The uploaded file for `key`, decoding the multipart body on first use.
    ///
    /// Plain multipart fields are merged into the body container as they are
    /// decoded. Returns `Ok(None)` for requests that are not multipart and for
    /// fields that carried no file bytes.
    ///
    /// # Errors
    ///
    /// Returns the decode error; every later call reports the same error.
    pub async fn file(&mut self, key: &str) -> Result<Option<&FilePart>, MultipartError> {
        self.ensure_multipart().await?;
        Ok(self.files.get(key))
    }

    /// Every uploaded file, decoding the multipart body on first use.
    ///
    /// # Errors
    ///
    /// Returns the decode error; every later call reports the same error.
    pub async fn files(&mut self) -> Result<&HashMap<String, FilePart>, MultipartError> {
        self.ensure_multipart().await?;
        Ok(&self.files)
    }

    async fn ensure_multipart(&mut self) -> Result<(), MultipartError> {
        match &self.multipart {
            MultipartState::Decoded => return Ok(()),
            MultipartState::Failed(e) => return Err(e.clone()),
            MultipartState::NotStarted => {}
        }
        if !self.is_multipart() {
            self.multipart = MultipartState::Decoded;
            return Ok(());
        }

        let result = self.decode_multipart().await;
        self.multipart = match &result {
            Ok(()) => MultipartState::Decoded,
            Err(e) => {
                warn!(error = %e, "multipart decode failed");
                MultipartState::Failed(e.clone())
            }
        };
        result
    }

    async fn decode_multipart(&mut self) -> Result<(), MultipartError> {
        let content_type = self.header("content-type").unwrap_or_default();
        let boundary = multipart::extract_boundary(content_type)?;
        let raw = self.raw_body.take().unwrap_or_default();
        let limit = self.config.multipart_max_bytes;

        let bytes = if self.is_base64_encoded {
            let estimate = base64::decoded_len_estimate(raw.len());
            if estimate > limit {
                return Err(MultipartError::BodyTooLarge {
                    size: estimate,
                    limit,
                });
            }
            BASE64
                .decode(raw.as_bytes())
                .map_err(|e| MultipartError::InvalidEncoding(e.to_string()))?
        } else {
            raw.into_bytes()
        };
        if bytes.len() > limit {
            return Err(MultipartError::BodyTooLarge {
                size: bytes.len(),
                limit,
            });
        }

        debug!(size = bytes.len(), boundary, "decoding multipart body");
        let mut collector = FormCollector::default();
        let body = &mut self.body;
        multipart::decode(
            bytes.as_slice(),
            &boundary,
            self.config.multipart_max_field_bytes,
            |event| {
                if let Some((name, value)) = collector.apply(event) {
                    body.set(name, value);
                }
            },
        )
        .await?;

        self.files = collector.finish();
        debug!(files = self.files.len(), "multipart body decoded");
        Ok(())
    }
}

impl From<RawEvent> for Request {
    fn from(event: RawEvent) -> Self {
        Self::new(event)
    }
}

/// Header lookup: exact key first, then ASCII case-insensitive.
fn header_value<'a>(headers: &'a Parameters, key: &str) -> Option<&'a str> {
    headers.get_str(key).or_else(|| {
        let map = headers.as_map()?;
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_str())
    })
}

/// Decode a string body as a JSON object. Anything else yields an empty body.
fn decode_json_body(raw: &str, is_base64_encoded: bool) -> Parameters {
    let bytes: Cow<'_, [u8]> = if is_base64_encoded {
        match BASE64.decode(raw.as_bytes()) {
            Ok(bytes) => Cow::Owned(bytes),
            Err(e) => {
                warn!(error = %e, "body is flagged as base64 but does not decode");
                return Parameters::default();
            }
        }
    } else {
        Cow::Borrowed(raw.as_bytes())
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Parameters::from(map),
        Ok(Value::Null) => Parameters::default(),
        Ok(other) => {
            debug!(body = %other, "ignoring non-object JSON body");
            Parameters::default()
        }
        Err(e) => {
            warn!(error = %e, "body is not valid JSON");
            Parameters::default()
        }
    }
}
