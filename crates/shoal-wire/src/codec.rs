use serde::{de::DeserializeOwned, Serialize};

use crate::WireError;

/// Serializes a value to JSON bytes for wire transmission.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(value).map_err(|err| WireError::Encode(err.to_string()))
}

/// Deserializes a JSON frame payload into a typed value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    serde_json::from_slice(bytes).map_err(|err| WireError::Decode(err.to_string()))
}
