//! API Gateway REST proxy events for Lambda handlers.
//!
//! [`Request`] normalizes one gateway event into header, path, query and body
//! containers, validates the merged input against closed schemas, decodes
//! `multipart/form-data` uploads and resolves the caller identity from the
//! authorizer context. [`Response`] builds the envelope returned to the
//! gateway.
//!
//! # Usage
//!
//! ```rust
//! use lambda_events_restapi::{Request, Response};
//! use lambda_events_validation::ValidationOptions;
//! use serde_json::json;
//!
//! let request = Request::from_value(json!({
//!     "pathParameters": { "name": "%E4%B8%AD%E6%96%87" },
//!     "queryStringParameters": { "page": "2" },
//!     "body": "{\"title\":\"hello\"}",
//! }))
//! .expect("valid event");
//!
//! assert_eq!(request.parameter("name"), json!("中文"));
//! assert_eq!(request.input("title"), json!("hello"));
//!
//! let result = request.validate(
//!     |s| [("title", s.string().required()), ("page", s.integer())].into(),
//!     ValidationOptions::default(),
//! );
//! let response = if result.error() {
//!     Response::new().json(&result, http::StatusCode::UNPROCESSABLE_ENTITY)
//! } else {
//!     Response::new().with_cors(true).json(&json!({ "ok": true }), http::StatusCode::OK)
//! };
//! assert_eq!(response.status_code, 200);
//! ```
//!
//! # Modules
//!
//! - [`directory`] - User directory trait, Cognito and in-memory backends
//! - [`error`] - Error types
//! - [`event`] - Typed gateway event model
//! - [`identity`] - Caller identity resolution
//! - [`multipart`] - Incremental `multipart/form-data` decoder
//! - [`parameters`] - Parameter containers
//! - [`path_parameters`] - Percent-decoding path parameter container
//! - [`request`] - The request normalizer
//! - [`response`] - Response envelopes

pub mod directory;
pub mod error;
pub mod event;
pub mod identity;
pub mod multipart;
pub mod parameters;
pub mod path_parameters;
pub mod request;
pub mod response;

pub use directory::{CognitoUserDirectory, DirectoryUser, StaticUserDirectory, UserDirectory};
pub use error::{DirectoryError, EventError, IdentityError, MultipartError};
pub use event::{Payload, RawEvent, RequestContext};
pub use identity::{Identity, IdentitySource, SignInReference};
pub use multipart::FilePart;
pub use parameters::Parameters;
pub use path_parameters::PathParameters;
pub use request::Request;
pub use response::{Response, ResponseOutput};
