//! Error types for the training-records API client.
//!
//! # Design
//! Every failure the client can observe is one `ApiError` variant, so UI
//! callers can branch on the kind (re-login on `SessionExpired`, show a CORS
//! hint on `CrossOriginRejected`) or just display the message. `NotFound`
//! keeps its own variant so recoverable absence is not confused with a
//! server fault.

use thiserror::Error;

/// Errors returned by the resolver, the providers and `handle_response`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable endpoint was resolved; remote calls are impossible.
    #[error("API URL is not configured: {0}")]
    Configuration(String),

    /// A candidate base URL was rejected during validation.
    #[error("invalid API URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },

    /// The server answered 401 to an authenticated call. The stored token
    /// has already been removed.
    #[error("session expired, please sign in again")]
    SessionExpired,

    /// The response was opaque (status 0): the browser blocked a
    /// cross-origin request.
    #[error("cross-origin request rejected: the backend does not allow requests from this origin, check its CORS settings")]
    CrossOriginRejected,

    /// The request never produced an HTTP response.
    #[error("could not connect to the server at {base_url}: {reason}")]
    Connectivity { base_url: String, reason: String },

    /// The server returned 404.
    #[error("{message}")]
    NotFound { message: String },

    /// The server returned a non-2xx status other than 401/404.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Local mode was selected but no local backend was supplied.
    #[error("local data provider is not initialized")]
    LocalProviderUnavailable,

    /// An operation that needs a session was called without a token.
    #[error("authorization token is missing, please sign in")]
    MissingToken,

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status carried by server-side failures, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::SessionExpired => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
