//! Error types for the protocol core

use vellum_common::stable_json::StableJsonError;

/// Result type alias for protocol-core operations
pub type Result<T> = std::result::Result<T, RootError>;

/// Protocol-core error
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RootError {
    /// Key handling or signing failed
    #[error("{0}")]
    Crypto(
        #[from]
        #[diagnostic_source]
        CryptoError,
    ),

    /// Canonical serialization failed
    #[error("canonical serialization failed: {0}")]
    Serialization(
        #[from]
        #[diagnostic_source]
        StableJsonError,
    ),
}

/// Key handling and signing errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CryptoError {
    /// Key material was not valid hex
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Private key had an unexpected length
    #[error("invalid private key length: {got} bytes (expected 32, or 33 with compressed marker)")]
    InvalidKeyLength {
        /// Decoded length in bytes
        got: usize,
    },

    /// Key bytes did not decode to a valid scalar or point
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(String),
}
