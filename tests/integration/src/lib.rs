//! End-to-end tests for lambda-events.
//!
//! Every scenario feeds a complete API Gateway proxy event through
//! [`Request`] and checks what a handler would observe. Directory lookups go
//! to a [`StaticUserDirectory`], so no test touches the network.
//!
//! ```text
//! cargo test -p lambda-events-integration
//! ```

use std::sync::{Arc, Once};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lambda_events_core::LambdaEventsConfig;
use lambda_events_restapi::{DirectoryUser, Request, StaticUserDirectory};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize tracing (once).
///
/// `RUST_LOG` wins; otherwise the filter comes from `LOG_LEVEL`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let directive = filter_directive(
            std::env::var(EnvFilter::DEFAULT_ENV).ok(),
            &LambdaEventsConfig::from_env(),
        );
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(directive))
            .with_test_writer()
            .init();
    });
}

/// The `EnvFilter` directive for a host: `rust_log` when set and non-empty,
/// else the configured log level.
#[must_use]
pub fn filter_directive(rust_log: Option<String>, config: &LambdaEventsConfig) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.log_level.clone())
}

/// User pool identifier used by the fixtures.
pub const POOL_ID: &str = "ap-northeast-1_pool";

/// Subject of the fixture user.
pub const USER_SUB: &str = "461b4f73-8aed-4fcd-bdc3-7da9711e2d1d";

/// Build a request from a JSON event, panicking on malformed fixtures.
#[must_use]
pub fn request(event: Value) -> Request {
    init_tracing();
    Request::from_value(event).unwrap_or_else(|e| panic!("invalid fixture event: {e}"))
}

/// The fixture user as the directory returns it.
#[must_use]
pub fn fixture_user() -> DirectoryUser {
    DirectoryUser::new(
        USER_SUB,
        [
            ("sub", USER_SUB),
            ("name", "test"),
            ("phone_number", "+886227935578"),
            ("email", "test@example.com"),
            ("email_verified", "true"),
        ],
    )
}

/// A directory holding only the fixture user.
#[must_use]
pub fn fixture_directory() -> Arc<StaticUserDirectory> {
    Arc::new(StaticUserDirectory::new(vec![(
        POOL_ID.to_owned(),
        fixture_user(),
    )]))
}

/// An event authenticated through the IAM authorizer.
#[must_use]
pub fn iam_event(auth_state: &str, sub: &str) -> Value {
    json!({
        "requestContext": {
            "authorizer": {
                "iam": {
                    "cognitoIdentity": {
                        "amr": [
                            auth_state,
                            format!("cognito-idp.ap-northeast-1.amazonaws.com/{POOL_ID}"),
                            format!("cognito-idp.ap-northeast-1.amazonaws.com/{POOL_ID}:CognitoSignIn:{sub}"),
                        ],
                    },
                },
            },
        },
    })
}

/// An event authenticated through the legacy caller identity block.
#[must_use]
pub fn legacy_identity_event(auth_type: &str, sub: &str) -> Value {
    json!({
        "requestContext": {
            "identity": {
                "cognitoAuthenticationType": auth_type,
                "cognitoAuthenticationProvider": format!(
                    "cognito-idp.ap-northeast-1.amazonaws.com/{POOL_ID},cognito-idp.ap-northeast-1.amazonaws.com/{POOL_ID}:CognitoSignIn:{sub}"
                ),
            },
        },
    })
}

/// A multipart event; the body is base64-encoded when `base64` is set.
#[must_use]
pub fn multipart_event(boundary: &str, body: &[u8], base64: bool) -> Value {
    let body = if base64 {
        BASE64.encode(body)
    } else {
        String::from_utf8_lossy(body).into_owned()
    };
    json!({
        "headers": { "Content-Type": format!("multipart/form-data; boundary={boundary}") },
        "body": body,
        "isBase64Encoded": base64,
    })
}

/// Assemble a multipart body from `(name, filename, content)` parts.
#[must_use]
pub fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

mod test_config;
mod test_identity;
mod test_multipart;
mod test_request;
mod test_response;
