//! Deterministic JSON serialization.
//!
//! Every signed artifact in the protocol is a stable JSON string: object
//! keys sorted ascending by code point, compact (no whitespace), arrays in
//! order. Any two implementations must produce the identical string for
//! the same logical value, or signatures will not match across peers.

use serde::Serialize;
use serde_json::Value;

/// Nesting beyond this depth is rejected. `serde_json::Value` cannot
/// express reference cycles, so runaway depth is the observable failure
/// mode of a cyclic input.
const MAX_DEPTH: usize = 128;

/// Errors from stable serialization.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum StableJsonError {
    /// The value could not be converted to a JSON tree
    #[error("value is not representable as JSON: {0}")]
    Convert(#[from] serde_json::Error),

    /// Nesting exceeded the recursion limit
    #[error("value nests deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Serialize a value to its canonical JSON string.
///
/// Keys are emitted in ascending code-point order regardless of the
/// source type's field order or map iteration order. `None` fields must be
/// skipped at the type level (`skip_serializing_if`); an explicit `null`
/// is preserved.
pub fn to_stable_string<T: Serialize>(value: &T) -> Result<String, StableJsonError> {
    let tree = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&tree, &mut out, 0)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String, depth: usize) -> Result<(), StableJsonError> {
    if depth > MAX_DEPTH {
        return Err(StableJsonError::TooDeep);
    }
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // serde_json's map is a BTreeMap, so iteration is already in
            // ascending code-point order.
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_value(item, out, depth + 1)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}
