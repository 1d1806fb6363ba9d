//! The file-API error type.
//!
//! Local lookups resolve to a stable kind (the errno taxonomy); gateway
//! transport failures and schema violations arrive as sources wrapped
//! under `RemoteIo`.

use std::fmt;
use vellum_common::error::{BoxError, ClientError, ErrorCode};
use vellum_common::gateway::GatewayError;
use vellum_common::storage::StorageError;
use vellum_root::RootError;
use vellum_root::policy::PolicyError;

/// Result type alias for datastore operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Datastore operation error with rich diagnostics
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct StoreError {
    kind: StoreErrorKind,
    #[source]
    source: Option<BoxError>,
    #[help]
    help: Option<String>,
    context: Option<String>,
}

/// Error categories for datastore operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
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
    /// Gateway transport failure, malformed response, or schema violation
    RemoteIo,
    /// No driver subset satisfies the replication strategy
    UnsatisfiableReplicationStrategy,
    /// A create whose outcome is ambiguous; recorded persistently
    PartialCreate,
    /// Durable storage operation failed
    Storage,
    /// Cryptographic operation failed
    Crypto,
    /// Serialization failed
    Serialization,
}

impl StoreError {
    /// Create a new error with the given kind and optional source
    pub fn new(kind: StoreErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            source,
            help: None,
            context: None,
        }
    }

    /// Add a help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add context information to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    // Constructors for the common kinds

    /// Create a not found error
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(StoreErrorKind::NotFound, None)
            .with_context(format!("{} not found: {}", resource, id))
    }

    /// Create an invalid-input error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Invalid, Some(msg.into().into()))
    }

    /// Create a storage error
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(StoreErrorKind::Storage, Some(Box::new(source)))
    }

    /// Create a crypto error
    pub fn crypto(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(StoreErrorKind::Crypto, Some(Box::new(source)))
    }

    /// Create a partial-create error
    pub fn partial_create(context: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::PartialCreate, None)
            .with_context(context)
            .with_help("the next mount-or-create retries the create idempotently")
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;

        if let Some(ctx) = &self.context {
            write!(f, ": {}", ctx)?;
        }

        if let Some(src) = &self.source {
            write!(f, ": {}", src)?;
        }

        Ok(())
    }
}

impl From<ClientError> for StoreError {
    fn from(e: ClientError) -> Self {
        StoreError::new(StoreErrorKind::RemoteIo, Some(Box::new(e)))
    }
}

impl From<GatewayError> for StoreError {
    fn from(e: GatewayError) -> Self {
        let kind = match e.code() {
            Some(ErrorCode::NotFound) => StoreErrorKind::NotFound,
            Some(ErrorCode::Exists) => StoreErrorKind::Exists,
            Some(ErrorCode::NotDir) => StoreErrorKind::NotDir,
            Some(ErrorCode::Perm) => StoreErrorKind::Perm,
            Some(ErrorCode::Access) => StoreErrorKind::Access,
            Some(ErrorCode::Invalid) => StoreErrorKind::Invalid,
            Some(ErrorCode::RemoteIo) | None => StoreErrorKind::RemoteIo,
        };
        StoreError::new(kind, Some(Box::new(e)))
    }
}

impl From<RootError> for StoreError {
    fn from(e: RootError) -> Self {
        let kind = match &e {
            RootError::Crypto(_) => StoreErrorKind::Crypto,
            RootError::Serialization(_) => StoreErrorKind::Serialization,
        };
        StoreError::new(kind, Some(Box::new(e)))
    }
}

impl From<vellum_root::error::CryptoError> for StoreError {
    fn from(e: vellum_root::error::CryptoError) -> Self {
        StoreError::new(StoreErrorKind::Crypto, Some(Box::new(e)))
    }
}

impl From<PolicyError> for StoreError {
    fn from(e: PolicyError) -> Self {
        StoreError::new(
            StoreErrorKind::UnsatisfiableReplicationStrategy,
            Some(Box::new(e)),
        )
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::storage(e)
    }
}

impl From<vellum_api::ArityError> for StoreError {
    fn from(e: vellum_api::ArityError) -> Self {
        StoreError::new(StoreErrorKind::Invalid, Some(Box::new(e)))
    }
}

impl From<vellum_common::stable_json::StableJsonError> for StoreError {
    fn from(e: vellum_common::stable_json::StableJsonError) -> Self {
        StoreError::new(StoreErrorKind::Serialization, Some(Box::new(e)))
    }
}
