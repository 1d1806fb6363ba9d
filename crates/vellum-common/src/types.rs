//! Validated identifier newtypes.
//!
//! Each identifier validates on construction and is immutable afterwards,
//! so the rest of the workspace can pass them around without re-checking.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Errors from identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum IdError {
    /// Identifier was empty
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Identifier contains a character outside its alphabet
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidChar {
        /// Which identifier kind rejected the input
        kind: &'static str,
        /// The offending character
        ch: char,
    },
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

macro_rules! id_common {
    ($ty:ident) => {
        impl $ty {
            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = IdError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    };
}

/// Base58Check address of the datastore keypair.
///
/// Full checksum validation happens where the address is derived; this
/// type enforces the alphabet so malformed ids are rejected at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatastoreId(SmolStr);

impl DatastoreId {
    /// Validate and wrap a datastore id.
    pub fn new(s: impl AsRef<str>) -> Result<Self, IdError> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(IdError::Empty("datastore id"));
        }
        if let Some(ch) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(IdError::InvalidChar {
                kind: "datastore id",
                ch,
            });
        }
        Ok(Self(SmolStr::new(s)))
    }
}

id_common!(DatastoreId);

/// Identifier of one device participating in a datastore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(SmolStr);

impl DeviceId {
    /// Validate and wrap a device id.
    pub fn new(s: impl AsRef<str>) -> Result<Self, IdError> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(IdError::Empty("device id"));
        }
        Ok(Self(SmolStr::new(s)))
    }
}

id_common!(DeviceId);

/// Application name a datastore is mounted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(SmolStr);

impl AppName {
    /// Validate and wrap an application name.
    pub fn new(s: impl AsRef<str>) -> Result<Self, IdError> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(IdError::Empty("app name"));
        }
        if let Some(ch) = s.chars().find(|c| c.is_whitespace()) {
            return Err(IdError::InvalidChar {
                kind: "app name",
                ch,
            });
        }
        Ok(Self(SmolStr::new(s)))
    }
}

id_common!(AppName);

/// On-chain name of the datastore owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockchainId(SmolStr);

impl BlockchainId {
    /// Validate and wrap a blockchain id.
    pub fn new(s: impl AsRef<str>) -> Result<Self, IdError> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(IdError::Empty("blockchain id"));
        }
        if let Some(ch) = s.chars().find(|c| c.is_whitespace()) {
            return Err(IdError::InvalidChar {
                kind: "blockchain id",
                ch,
            });
        }
        Ok(Self(SmolStr::new(s)))
    }
}

id_common!(BlockchainId);
