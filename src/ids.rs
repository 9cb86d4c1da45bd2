//! Deterministic content-addressed ids.

use serde::Serialize;

use crate::errors::GraphStoreError;

/// Bytes of the BLAKE3 digest kept in an id.
const ID_DIGEST_BYTES: usize = 16;

/// Mints `"{namespace}/#{hex}"` from the compact JSON encoding of `value`.
/// Equal documents (including key order) always yield the same id.
pub fn content_id<T: Serialize + ?Sized>(
    namespace: &str,
    value: &T,
) -> Result<String, GraphStoreError> {
    let encoded = serde_json::to_vec(value)?;
    let digest = blake3::hash(&encoded);
    Ok(format!(
        "{namespace}/#{}",
        hex::encode(&digest.as_bytes()[..ID_DIGEST_BYTES])
    ))
}
