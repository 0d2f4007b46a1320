//! Error types for the lambda-events core.

/// Core error type shared by the lambda-events crates.
#[derive(Debug, thiserror::Error)]
pub enum LambdaEventsError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
