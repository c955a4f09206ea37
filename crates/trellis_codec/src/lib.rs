//! # TrellisDB Codec
//!
//! Key model, key paths, and value serialization for TrellisDB.
//!
//! This crate provides:
//! - [`Key`]: the totally ordered record key domain, with an explicit
//!   invalid variant so conversion from dynamic values never fails
//! - [`KeyPath`]: in-line key extraction and injection
//! - [`Value`]: the dynamic record payload type
//! - [`serialize`]/[`deserialize`]: the payload codec, including
//!   clone-ability checks and blob-handle accounting

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod key;
mod key_path;
mod serialize;
mod value;

pub use error::{CodecError, CodecResult};
pub use key::Key;
pub use key_path::KeyPath;
pub use serialize::{deserialize, serialize, SerializedValue};
pub use value::{BlobHandle, Value};
