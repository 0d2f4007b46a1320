//! Proxy-integration response envelopes.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Content type of every envelope body.
pub const CONTENT_TYPE: &str = "application/json";

/// Value of `Access-Control-Allow-Headers` in CORS mode.
pub const CORS_ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

/// Value of `Access-Control-Allow-Methods` in CORS mode.
pub const CORS_ALLOW_METHODS: &str = "OPTIONS,GET,POST,PUT,PATCH,DELETE";

/// The envelope API Gateway expects from a proxy integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOutput {
    /// HTTP status code.
    pub status_code: u16,
    /// JSON-encoded body.
    pub body: String,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
}

/// Builds [`ResponseOutput`] envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Response {
    cors: bool,
}

impl Response {
    /// A builder without CORS headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable CORS headers.
    #[must_use]
    pub fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    /// Whether CORS headers are added.
    #[must_use]
    pub fn cors(&self) -> bool {
        self.cors
    }

    /// Serialize `data` as the body.
    ///
    /// Data that cannot be serialized produces a 500 error envelope.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(&self, data: &T, status: StatusCode) -> ResponseOutput {
        match serde_json::to_string(data) {
            Ok(body) => self.envelope(status, body),
            Err(e) => {
                error!(error = %e, "response body is not serializable");
                self.error("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// An `{"error": message}` body.
    #[must_use]
    pub fn error(&self, message: impl Into<String>, status: StatusCode) -> ResponseOutput {
        let body = serde_json::json!({ "error": message.into() }).to_string();
        self.envelope(status, body)
    }

    /// A 404 error envelope.
    #[must_use]
    pub fn not_found(&self, message: impl Into<String>) -> ResponseOutput {
        self.error(message, StatusCode::NOT_FOUND)
    }

    fn envelope(&self, status: StatusCode, body: String) -> ResponseOutput {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_owned(), CONTENT_TYPE.to_owned());
        if self.cors {
            headers.insert("Access-Control-Allow-Origin".to_owned(), "*".to_owned());
            headers.insert(
                "Access-Control-Allow-Headers".to_owned(),
                CORS_ALLOW_HEADERS.to_owned(),
            );
            headers.insert(
                "Access-Control-Allow-Methods".to_owned(),
                CORS_ALLOW_METHODS.to_owned(),
            );
        }
        ResponseOutput {
            status_code: status.as_u16(),
            body,
            headers,
        }
    }
}
