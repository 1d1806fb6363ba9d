//! Common types for the vellum datastore client
//!
//! This crate carries the plumbing shared by every vellum crate: the error
//! taxonomy, the gateway request/response machinery (including the
//! transport seam), the one-slot durable blob storage, stable JSON
//! serialization, and the validated identifier newtypes.

#![warn(missing_docs)]

pub use smol_str;
pub use url;

pub mod error;
/// Gateway request/response machinery, transport seam, status mapping.
pub mod gateway;
/// Deterministic JSON serialization for signing.
pub mod stable_json;
/// One-slot durable storage for the user-data blob.
pub mod storage;
/// Validated identifier newtypes.
pub mod types;

use smol_str::SmolStr;

/// Credential attached to gateway requests.
///
/// Both variants render as `Authorization: bearer …`; the gateway tells them
/// apart server-side. The API password is the auxiliary administrative path
/// and is only honored by a handful of endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthToken {
    /// Session JWT issued by the gateway's auth endpoint.
    Session(SmolStr),
    /// Node API password.
    ApiPassword(SmolStr),
}

impl AuthToken {
    /// The raw credential string.
    pub fn secret(&self) -> &str {
        match self {
            AuthToken::Session(t) | AuthToken::ApiPassword(t) => t.as_str(),
        }
    }
}
