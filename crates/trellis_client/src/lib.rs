//! # TrellisDB Client
//!
//! The client-side transaction and request pipeline for TrellisDB.
//!
//! A [`Database`] connection hands out [`Transaction`]s; each transaction
//! vends [`ObjectStore`] handles whose operations validate their
//! preconditions synchronously, enqueue work in call order, and return a
//! [`Request`] that completes once the transaction's queue is pumped with
//! [`Transaction::dispatch_pending`]. Schema changes made inside a
//! version-change transaction roll back if it aborts.
//!
//! The [`server::StoreServer`] trait is the seam to the backing store;
//! [`server::memory::MemoryServer`] keeps everything in process memory.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod database;
mod error;
mod index;
mod key_range;
mod object_store;
mod request;
mod schema;
pub mod server;
mod transaction;
mod types;

pub use database::Database;
pub use error::{ClientError, ClientResult};
pub use index::Index;
pub use key_range::KeyRange;
pub use object_store::ObjectStore;
pub use request::{CursorHandle, Outcome, Request, RequestResult};
pub use schema::{DatabaseInfo, IndexInfo, IndexParameters, ObjectStoreInfo};
pub use transaction::{
    CursorDirection, OverwriteMode, Transaction, TransactionMode, TransactionState,
};
pub use types::{
    CursorIdentifier, IndexIdentifier, ObjectStoreIdentifier, ResourceIdentifier,
    TransactionIdentifier,
};
