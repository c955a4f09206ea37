//! Backing store abstraction the client dispatches operations to.

pub mod memory;

use crate::error::ClientResult;
use crate::key_range::KeyRange;
use crate::request::CursorHandle;
use crate::schema::{IndexInfo, ObjectStoreInfo};
use crate::transaction::{CursorDirection, OverwriteMode};
use crate::types::{CursorIdentifier, IndexIdentifier, ObjectStoreIdentifier};
use trellis_codec::{Key, SerializedValue, Value};

/// Record-level operations a backing store must provide.
///
/// The client performs every precondition check before an operation
/// reaches the server; errors returned here are delivered through the
/// originating request's error channel, never thrown at the call site.
pub trait StoreServer: Send {
    /// Registers a newly created object store.
    fn register_object_store(&mut self, info: &ObjectStoreInfo) -> ClientResult<()>;

    /// Removes an object store and all of its records.
    fn delete_object_store(&mut self, store: ObjectStoreIdentifier) -> ClientResult<()>;

    /// Returns the value of the first record in the range, if any.
    fn get_record(
        &mut self,
        store: ObjectStoreIdentifier,
        range: &KeyRange,
    ) -> ClientResult<Option<Value>>;

    /// Stores a record, generating a key if none was supplied, and
    /// returns the key the record was stored under.
    fn put_or_add(
        &mut self,
        store: ObjectStoreIdentifier,
        key: Option<Key>,
        value: &SerializedValue,
        overwrite: OverwriteMode,
    ) -> ClientResult<Key>;

    /// Deletes every record in the range.
    fn delete_record(&mut self, store: ObjectStoreIdentifier, range: &KeyRange)
        -> ClientResult<()>;

    /// Deletes every record in the store.
    fn clear_object_store(&mut self, store: ObjectStoreIdentifier) -> ClientResult<()>;

    /// Counts records in the range, through an index when one is named.
    fn count(
        &mut self,
        store: ObjectStoreIdentifier,
        index: Option<IndexIdentifier>,
        range: &KeyRange,
    ) -> ClientResult<u64>;

    /// Creates an index and backfills it from existing records.
    fn create_index(&mut self, info: &IndexInfo) -> ClientResult<()>;

    /// Removes an index and its entries.
    fn delete_index(
        &mut self,
        store: ObjectStoreIdentifier,
        index: IndexIdentifier,
    ) -> ClientResult<()>;

    /// Opens a cursor over the range and returns its first position, or
    /// `None` when the range holds no records.
    fn open_cursor(
        &mut self,
        store: ObjectStoreIdentifier,
        range: &KeyRange,
        direction: CursorDirection,
    ) -> ClientResult<Option<CursorHandle>>;

    /// Advances a cursor and returns its new position, or `None` when it
    /// has moved past the last record in its range.
    fn iterate_cursor(
        &mut self,
        cursor: CursorIdentifier,
        count: u32,
    ) -> ClientResult<Option<CursorHandle>>;
}
