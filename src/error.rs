//! Error types for the rashaqa application.

use thiserror::Error;

/// Errors that can occur when collecting user input.
///
/// Numeric fields never fail (they fall back to zero), so only the
/// enumerated choices can be rejected.
#[derive(Debug, Error, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum InputError {
    #[error("unknown gender: {0}")]
    UnknownGender(String),

    #[error("unknown activity level: {0}")]
    UnknownActivityLevel(String),

    #[error("unknown goal: {0}")]
    UnknownGoal(String),
}

/// Errors that can occur when talking to the generative-language API.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
