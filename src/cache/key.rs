//! Cache Key Module
//!
//! Derives compact cache keys of the form `{namespace}:{encoded_params}`.

use std::fmt::Debug;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

/// Maximum length of the encoded parameter part of a key.
///
/// Two parameter values whose encodings share this prefix map to the same key.
pub const KEY_PARAMS_MAX_LEN: usize = 50;

// == Derive Key ==
/// Builds the cache key for a namespace and parameter value.
///
/// `params` is serialized with serde_json, base64-encoded and truncated to
/// [`KEY_PARAMS_MAX_LEN`] characters. Field order is whatever serde emits, so
/// callers wanting reproducible keys should pass structs or ordered maps.
/// If serialization fails the `Debug` rendering is encoded instead; this
/// function never fails.
pub fn derive_key<P>(namespace: &str, params: &P) -> String
where
    P: Serialize + Debug + ?Sized,
{
    let serialized = serde_json::to_string(params).unwrap_or_else(|_| format!("{:?}", params));
    let mut encoded = STANDARD.encode(serialized.as_bytes());
    // base64 output is ASCII, so byte truncation stays on a char boundary
    encoded.truncate(KEY_PARAMS_MAX_LEN);
    format!("{}:{}", namespace, encoded)
}

/// Returns the key prefix shared by every key in `namespace`.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}:", namespace)
}
