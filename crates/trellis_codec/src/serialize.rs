//! Value serialization for record payloads.

use crate::error::{CodecError, CodecResult};
use crate::value::{BlobHandle, Value};

/// A value serialized for storage or transport.
///
/// Blob handles are carried alongside the payload bytes so the receiving
/// side can account for externally managed binary data without decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedValue {
    bytes: Vec<u8>,
    blob_handles: Vec<BlobHandle>,
}

impl SerializedValue {
    /// Returns the payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the blob handles referenced by the payload.
    #[must_use]
    pub fn blob_handles(&self) -> &[BlobHandle] {
        &self.blob_handles
    }

    /// Returns true if the payload references any blobs.
    #[must_use]
    pub fn has_blob_handles(&self) -> bool {
        !self.blob_handles.is_empty()
    }
}

/// Serializes a value into a storable payload.
///
/// # Errors
///
/// Fails with [`CodecError::NotCloneable`] if the value graph contains an
/// opaque host-object handle, and with [`CodecError::Encode`] on encoder
/// failure.
pub fn serialize(value: &Value) -> CodecResult<SerializedValue> {
    let mut blob_handles = Vec::new();
    check_cloneable(value, &mut blob_handles)?;

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| CodecError::encode(e.to_string()))?;

    Ok(SerializedValue {
        bytes,
        blob_handles,
    })
}

/// Deserializes a payload back into a value.
///
/// # Errors
///
/// Fails with [`CodecError::Decode`] if the bytes are not a valid payload.
pub fn deserialize(serialized: &SerializedValue) -> CodecResult<Value> {
    ciborium::de::from_reader(serialized.bytes())
        .map_err(|e| CodecError::decode(e.to_string()))
}

/// Walks the value graph, rejecting host handles and collecting blob refs.
fn check_cloneable(value: &Value, blob_handles: &mut Vec<BlobHandle>) -> CodecResult<()> {
    match value {
        Value::External(handle) => Err(CodecError::not_cloneable(format!(
            "host object handle {handle} cannot be stored"
        ))),
        Value::Blob(handle) => {
            blob_handles.push(*handle);
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                check_cloneable(item, blob_handles)?;
            }
            Ok(())
        }
        Value::Map(pairs) => {
            for (_, v) in pairs {
                check_cloneable(v, blob_handles)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
