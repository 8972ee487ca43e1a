//! Error types for the TeamDynamix client.
//!
//! This module defines `TdxError`, the unified error type used throughout
//! the crate for consistent error handling and propagation.
//!
//! # Taxonomy
//!
//! - Credential errors: the API rejected the username/password or admin keys.
//! - Token errors: the bearer token could not be read (missing `exp` claim,
//!   malformed payload, empty login response).
//! - Request errors: transport failures and non-success HTTP statuses other
//!   than the single 401 the client recovers from itself.
//!
//! # Security
//!
//! Error messages built from server responses must be passed through
//! `sanitize_message()` so passwords, web services keys and bearer tokens are
//! never leaked in logs or printed output.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all TeamDynamix operations.
#[derive(Error, Debug)]
pub enum TdxError {
    /// Configuration error - missing or invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// The API rejected the supplied credentials during login.
    #[error("credential error: {0}")]
    Credentials(String),

    /// The bearer token returned by the API could not be decoded.
    #[error("token error: {0}")]
    Token(String),

    /// A request was still unauthorized after re-authenticating once.
    #[error("authentication failed: token expired and refresh failed")]
    Authentication,

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP response returned a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The response body, potentially containing error details.
        body: String,
    },

    /// A success response had no body where a record was expected.
    #[error("empty response from {operation}")]
    EmptyResponse {
        /// The operation that returned nothing.
        operation: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The ticket text generator failed.
    #[error("ticket generation failed: {0}")]
    Generator(String),
}

impl TdxError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        TdxError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TdxError::Config(message.into())
    }

    /// Creates a credential error.
    pub fn credentials(message: impl Into<String>) -> Self {
        TdxError::Credentials(message.into())
    }

    /// Creates a token error.
    pub fn token(message: impl Into<String>) -> Self {
        TdxError::Token(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TdxError::Validation(message.into())
    }

    /// Creates a generator error.
    pub fn generator(message: impl Into<String>) -> Self {
        TdxError::Generator(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        TdxError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates an empty-response error.
    pub fn empty_response(operation: impl Into<String>) -> Self {
        TdxError::EmptyResponse {
            operation: operation.into(),
        }
    }

    /// Maps a transport error, classifying timeouts separately.
    pub(crate) fn from_transport(
        error: reqwest::Error,
        duration: Duration,
        operation: impl Into<String>,
    ) -> Self {
        if error.is_timeout() {
            return TdxError::timeout(duration, operation);
        }
        TdxError::Http(error)
    }

    /// Returns true for network and HTTP failures that are not credential,
    /// token or authentication problems.
    #[must_use]
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            TdxError::Http(_)
                | TdxError::HttpStatus { .. }
                | TdxError::EmptyResponse { .. }
                | TdxError::Timeout { .. }
        )
    }

    /// Returns true if the failure is about who we are rather than what we asked for.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            TdxError::Credentials(_) | TdxError::Token(_) | TdxError::Authentication
        )
    }

    /// Returns the HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            TdxError::HttpStatus { status, .. } => Some(*status),
            TdxError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Replaces every occurrence of each secret in `message` with `[REDACTED]`.
    ///
    /// Empty secrets are skipped.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        Self::sanitize_message(&self.to_string(), secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = TdxError::missing_env("TDX_BASE_URL");
        assert!(err.to_string().contains("TDX_BASE_URL"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_credentials_error_display() {
        let err = TdxError::credentials("invalid administrative credentials");
        assert_eq!(
            err.to_string(),
            "credential error: invalid administrative credentials"
        );
        assert!(err.is_auth_error());
        assert!(!err.is_request_error());
    }

    #[test]
    fn test_token_error_display() {
        let err = TdxError::token("token missing expiration claim");
        assert_eq!(err.to_string(), "token error: token missing expiration claim");
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_http_status_is_request_error() {
        let err = TdxError::HttpStatus {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert!(err.is_request_error());
        assert_eq!(
            err.status(),
            Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn test_timeout_error() {
        let err = TdxError::timeout(Duration::from_secs(30), "POST api/42/tickets");
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("30s"));
        assert!(err.is_request_error());
    }

    #[test]
    fn test_authentication_is_not_request_error() {
        assert!(!TdxError::Authentication.is_request_error());
        assert!(TdxError::Authentication.is_auth_error());
    }

    #[test]
    fn test_sanitize_message_removes_all_secrets() {
        let message = "login as bob with hunter2 got token eyJabc";
        let sanitized = TdxError::sanitize_message(message, &["hunter2", "eyJabc"]);
        assert!(!sanitized.contains("hunter2"));
        assert!(!sanitized.contains("eyJabc"));
        assert_eq!(sanitized.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn test_sanitize_message_skips_empty_secret() {
        let message = "Some error message";
        let sanitized = TdxError::sanitize_message(message, &["", "not_present"]);
        assert_eq!(sanitized, message);
    }
}
