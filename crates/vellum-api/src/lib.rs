//! Typed bindings for the datastore gateway.
//!
//! One module per endpoint family. Every request type implements
//! [`GatewayRequest`](vellum_common::gateway::GatewayRequest); the
//! response types are the wire schemas - a response that fails to decode
//! against them is a schema violation, which is the only dependency the
//! higher layers have on "what the gateway accepts".

#![warn(missing_docs)]

pub mod auth;
pub mod device_root;
pub mod file;
pub mod node;
pub mod profile;
pub mod store;

use serde::{Deserialize, Serialize};

/// Request body shared by the mutation endpoints.
///
/// `headers`, `payloads`, and `signatures` are positionally 1:1; the
/// constructor rejects mismatched arities so a malformed bundle can never
/// reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBody {
    /// Serialized mutable-data envelopes
    pub headers: Vec<String>,
    /// Base64 payload bytes, one per header
    pub payloads: Vec<String>,
    /// Base64 signatures, one per header
    pub signatures: Vec<String>,
    /// Signed tombstones accompanying this mutation
    pub tombstones: Vec<String>,
    /// Canonical JSON of the datastore descriptor
    pub datastore_str: String,
    /// Signature over `datastore_str`
    pub datastore_sig: String,
}

impl MutationBody {
    /// Build a mutation body, enforcing the positional correspondence.
    pub fn new(
        headers: Vec<String>,
        payloads: Vec<String>,
        signatures: Vec<String>,
        tombstones: Vec<String>,
        datastore_str: String,
        datastore_sig: String,
    ) -> Result<Self, ArityError> {
        if headers.len() != payloads.len() || headers.len() != signatures.len() {
            return Err(ArityError {
                headers: headers.len(),
                payloads: payloads.len(),
                signatures: signatures.len(),
            });
        }
        Ok(Self {
            headers,
            payloads,
            signatures,
            tombstones,
            datastore_str,
            datastore_sig,
        })
    }
}

/// Mismatched header/payload/signature arities in a mutation body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error(
    "mutation body arity mismatch: {headers} headers, {payloads} payloads, {signatures} signatures"
)]
pub struct ArityError {
    /// Header count
    pub headers: usize,
    /// Payload count
    pub payloads: usize,
    /// Signature count
    pub signatures: usize,
}

/// Response carrying only a status flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Whether the operation succeeded
    pub status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_is_enforced() {
        let err = MutationBody::new(
            vec!["h".into()],
            vec![],
            vec!["s".into()],
            vec![],
            "d".into(),
            "sig".into(),
        )
        .unwrap_err();
        assert_eq!(err.headers, 1);
        assert_eq!(err.payloads, 0);

        assert!(
            MutationBody::new(
                vec!["h".into()],
                vec!["p".into()],
                vec!["s".into()],
                vec![],
                "d".into(),
                "sig".into(),
            )
            .is_ok()
        );
    }
}
