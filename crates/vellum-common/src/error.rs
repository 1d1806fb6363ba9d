//! Error types for gateway client operations

use bytes::Bytes;

/// Boxed error type for error sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Client error type wrapping all possible error conditions
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ClientError {
    /// HTTP transport error
    #[error("HTTP transport error: {0}")]
    Transport(
        #[from]
        #[diagnostic_source]
        TransportError,
    ),

    /// Request serialization failed
    #[error("{0}")]
    Encode(
        #[from]
        #[diagnostic_source]
        EncodeError,
    ),

    /// Response deserialization failed
    #[error("{0}")]
    Decode(
        #[from]
        #[diagnostic_source]
        DecodeError,
    ),

    /// HTTP error response
    #[error("HTTP {0}")]
    Http(
        #[from]
        #[diagnostic_source]
        HttpError,
    ),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(
        #[from]
        #[diagnostic_source]
        AuthError,
    ),
}

/// Transport-level errors that occur during HTTP communication
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TransportError {
    /// Failed to establish connection to the gateway
    #[error("Connection error: {0}")]
    Connect(String),

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// Request construction failed (malformed URI, headers, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other transport error
    #[error("Transport error: {0}")]
    Other(BoxError),
}

/// Request serialization errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EncodeError {
    /// Failed to serialize query parameters
    #[error("Failed to serialize query: {0}")]
    Query(
        #[from]
        #[source]
        serde_html_form::ser::Error,
    ),

    /// Failed to serialize JSON body
    #[error("Failed to serialize JSON: {0}")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// Response deserialization errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    /// JSON deserialization failed
    #[error("Failed to deserialize JSON: {0}")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),

    /// Response parsed but did not match the expected wire schema
    #[error("Response violates the {schema} schema: {source}")]
    Schema {
        /// Name of the violated schema
        schema: &'static str,
        /// Underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP error response outside the mapped status taxonomy (5xx and
/// unexpected codes). Surfaces as an exception rather than an error code.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct HttpError {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response body if available
    pub body: Option<Bytes>,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(body) = &self.body {
            if let Ok(s) = std::str::from_utf8(body) {
                write!(f, ":\n{}", s)?;
            }
        }
        Ok(())
    }
}

/// Authentication and authorization errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum AuthError {
    /// Request requires authentication but none was provided
    #[error("No credential provided, but endpoint requires auth")]
    NotAuthenticated,

    /// The gateway rejected the presented credential
    #[error("Credential rejected by gateway")]
    Rejected,
}

/// Stable, wire-independent error taxonomy for datastore lookups.
///
/// Inbound mapping from gateway status codes: 400 is a permission failure,
/// 401 a well-formedness failure, 403 an access failure, 404 a missing
/// resource. Anything at 500 or above is a transport exception
/// ([`HttpError`]), never a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No such file, directory, or datastore
    NotFound,
    /// Path collision on create-without-overwrite
    Exists,
    /// Parent lookup returned a non-directory
    NotDir,
    /// Operation not permitted
    Perm,
    /// Access denied
    Access,
    /// Malformed request or datum
    Invalid,
    /// Remote I/O failure
    RemoteIo,
}

impl ErrorCode {
    /// Map an inbound gateway status code to the taxonomy.
    ///
    /// Returns `None` for success codes and for statuses that must surface
    /// as transport exceptions instead.
    pub fn from_status(status: http::StatusCode) -> Option<Self> {
        match status.as_u16() {
            400 => Some(ErrorCode::Perm),
            401 => Some(ErrorCode::Invalid),
            403 => Some(ErrorCode::Access),
            404 => Some(ErrorCode::NotFound),
            _ => None,
        }
    }

    /// The conventional errno name for this code.
    pub const fn errno(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "ENOENT",
            ErrorCode::Exists => "EEXIST",
            ErrorCode::NotDir => "ENOTDIR",
            ErrorCode::Perm => "EPERM",
            ErrorCode::Access => "EACCES",
            ErrorCode::Invalid => "EINVAL",
            ErrorCode::RemoteIo => "EREMOTEIO",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.errno())
    }
}

#[cfg(feature = "reqwest-client")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() || e.is_request() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Other(Box::new(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        use http::StatusCode;
        assert_eq!(
            ErrorCode::from_status(StatusCode::BAD_REQUEST),
            Some(ErrorCode::Perm)
        );
        assert_eq!(
            ErrorCode::from_status(StatusCode::UNAUTHORIZED),
            Some(ErrorCode::Invalid)
        );
        assert_eq!(
            ErrorCode::from_status(StatusCode::FORBIDDEN),
            Some(ErrorCode::Access)
        );
        assert_eq!(
            ErrorCode::from_status(StatusCode::NOT_FOUND),
            Some(ErrorCode::NotFound)
        );
        // 5xx is a transport exception, not a code
        assert_eq!(
            ErrorCode::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            None
        );
        assert_eq!(ErrorCode::from_status(StatusCode::OK), None);
    }

    #[test]
    fn errno_names() {
        assert_eq!(ErrorCode::NotFound.to_string(), "ENOENT");
        assert_eq!(ErrorCode::Exists.errno(), "EEXIST");
    }
}
