//! The object store operation façade.
//!
//! Every operation validates its preconditions synchronously, in a fixed
//! order, before anything is enqueued: a precondition failure returns an
//! error and never creates a request. The deleted-store check runs before
//! the transaction-active check, so a deleted store reports invalid state
//! even inside an inactive transaction.

use crate::error::{ClientError, ClientResult};
use crate::index::{Index, IndexRegistry};
use crate::key_range::KeyRange;
use crate::request::Request;
use crate::schema::{IndexParameters, ObjectStoreInfo};
use crate::transaction::{CursorDirection, OverwriteMode, Transaction};
use crate::types::ObjectStoreIdentifier;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use trellis_codec::{serialize, Key, KeyPath, Value};

/// Operation handle for one object store within a transaction.
#[derive(Debug)]
pub struct ObjectStore {
    info: Mutex<ObjectStoreInfo>,
    original_info: ObjectStoreInfo,
    transaction: Arc<Transaction>,
    created_in_transaction: bool,
    deleted: AtomicBool,
    indexes: IndexRegistry,
}

impl ObjectStore {
    pub(crate) fn new(
        info: ObjectStoreInfo,
        transaction: &Arc<Transaction>,
        created_in_transaction: bool,
    ) -> Arc<ObjectStore> {
        Arc::new(ObjectStore {
            original_info: info.clone(),
            info: Mutex::new(info),
            transaction: Arc::clone(transaction),
            created_in_transaction,
            deleted: AtomicBool::new(false),
            indexes: IndexRegistry::default(),
        })
    }

    /// Returns a snapshot of the store's current metadata.
    #[must_use]
    pub fn info(&self) -> ObjectStoreInfo {
        self.info.lock().clone()
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> String {
        self.info.lock().name().to_string()
    }

    /// Returns the store identifier.
    #[must_use]
    pub fn identifier(&self) -> ObjectStoreIdentifier {
        self.info.lock().identifier()
    }

    /// Returns true if the store has a key generator.
    #[must_use]
    pub fn auto_increment(&self) -> bool {
        self.info.lock().auto_increment()
    }

    /// Returns the in-line key path, if the store uses one.
    #[must_use]
    pub fn key_path(&self) -> Option<KeyPath> {
        self.info.lock().key_path().cloned()
    }

    /// Returns the store's index names, sorted.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.info.lock().index_names()
    }

    /// Returns the owning transaction.
    #[must_use]
    pub fn transaction(&self) -> &Arc<Transaction> {
        &self.transaction
    }

    /// Returns true once the store has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_as_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    /// Stores a record, replacing any existing record under the same key.
    ///
    /// # Errors
    ///
    /// See [`put_or_add`](ObjectStore::put_or_add) for the precondition
    /// order.
    pub fn put(&self, value: Value, key: Option<Key>) -> ClientResult<Arc<Request>> {
        self.put_or_add(value, key, OverwriteMode::Overwrite)
    }

    /// Stores a record, failing through the request's error channel with a
    /// constraint error if the key already exists.
    ///
    /// # Errors
    ///
    /// See [`put_or_add`](ObjectStore::put_or_add) for the precondition
    /// order.
    pub fn add(&self, value: Value, key: Option<Key>) -> ClientResult<Arc<Request>> {
        self.put_or_add(value, key, OverwriteMode::NoOverwrite)
    }

    /// Stores a record under the given overwrite policy.
    ///
    /// Preconditions, checked in order: a live execution context (unknown
    /// error), store not deleted (invalid state), transaction active
    /// (transaction inactive), transaction writable (read-only), value
    /// serializable (data clone), no blob references in an ephemeral
    /// session (data clone), explicit key valid (data), key arrangement
    /// consistent with the store's key path and generator (data).
    pub fn put_or_add(
        &self,
        value: Value,
        key: Option<Key>,
        overwrite: OverwriteMode,
    ) -> ClientResult<Arc<Request>> {
        let database = self.transaction.database();
        database.assert_origin_thread();

        if !database.has_live_context() {
            return Err(ClientError::unknown(
                "unable to store a record without a live execution context",
            ));
        }
        if self.is_deleted() {
            return Err(ClientError::invalid_state(
                "cannot store a record: the object store has been deleted",
            ));
        }
        if !self.transaction.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot store a record: the transaction is inactive or finished",
            ));
        }
        if self.transaction.is_read_only() {
            return Err(ClientError::read_only(
                "cannot store a record in a read-only transaction",
            ));
        }

        let serialized = serialize(&value)
            .map_err(|_| ClientError::data_clone("the value could not be cloned"))?;
        if serialized.has_blob_handles() && database.is_ephemeral_session() {
            return Err(ClientError::data_clone(
                "blob references cannot be stored in an ephemeral session",
            ));
        }

        if let Some(key) = &key {
            if !key.is_valid() {
                return Err(ClientError::data("the parameter is not a valid key"));
            }
        }

        let info = self.info.lock().clone();
        let uses_key_generator = info.auto_increment();
        let mut key = key;

        if let Some(key_path) = info.key_path() {
            if key.is_some() {
                return Err(ClientError::data(
                    "the object store uses in-line keys and a key parameter was provided",
                ));
            }
            match key_path.extract(&value) {
                Some(extracted) if !extracted.is_valid() => {
                    return Err(ClientError::data(
                        "evaluating the key path yielded a value that is not a valid key",
                    ));
                }
                Some(extracted) => key = Some(extracted),
                None => {
                    if uses_key_generator {
                        if !key_path.can_inject(&value) {
                            return Err(ClientError::data(
                                "a generated key cannot be injected at the key path",
                            ));
                        }
                    } else {
                        return Err(ClientError::data(
                            "evaluating the key path did not yield a value",
                        ));
                    }
                }
            }
        } else if !uses_key_generator && key.is_none() {
            return Err(ClientError::data(
                "the store uses out-of-line keys, has no key generator, and no key was provided",
            ));
        }

        debug!(store = %self.identifier(), ?overwrite, "put_or_add");
        Ok(self
            .transaction
            .request_put_or_add(self.identifier(), key, serialized, overwrite))
    }

    /// Replaces the record at a cursor's current position.
    ///
    /// The key is the cursor's primary key, so the in-line key arrangement
    /// checks of [`put_or_add`](ObjectStore::put_or_add) do not apply; the
    /// remaining preconditions are checked in the same order.
    pub fn put_for_cursor_update(&self, value: Value, key: Key) -> ClientResult<Arc<Request>> {
        let database = self.transaction.database();
        database.assert_origin_thread();

        if !database.has_live_context() {
            return Err(ClientError::unknown(
                "unable to store a record without a live execution context",
            ));
        }
        if self.is_deleted() {
            return Err(ClientError::invalid_state(
                "cannot store a record: the object store has been deleted",
            ));
        }
        if !self.transaction.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot store a record: the transaction is inactive or finished",
            ));
        }
        if self.transaction.is_read_only() {
            return Err(ClientError::read_only(
                "cannot store a record in a read-only transaction",
            ));
        }

        let serialized = serialize(&value)
            .map_err(|_| ClientError::data_clone("the value could not be cloned"))?;
        if serialized.has_blob_handles() && database.is_ephemeral_session() {
            return Err(ClientError::data_clone(
                "blob references cannot be stored in an ephemeral session",
            ));
        }
        if !key.is_valid() {
            return Err(ClientError::data("the parameter is not a valid key"));
        }

        Ok(self.transaction.request_put_or_add(
            self.identifier(),
            Some(key),
            serialized,
            OverwriteMode::OverwriteForCursor,
        ))
    }

    /// Fetches the record stored under this key.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted,
    /// a transaction-inactive error when the transaction is not active,
    /// and a data error when the key is invalid.
    pub fn get(&self, key: Key) -> ClientResult<Arc<Request>> {
        if !key.is_valid() {
            self.check_readable("get a record")?;
            return Err(ClientError::data("the parameter is not a valid key"));
        }
        let range = KeyRange::only(key)?;
        self.get_range(range)
    }

    /// Fetches the first record whose key falls in the range.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`get`](ObjectStore::get).
    pub fn get_range(&self, range: KeyRange) -> ClientResult<Arc<Request>> {
        self.check_readable("get a record")?;
        Ok(self.transaction.request_get_record(self.identifier(), range))
    }

    /// Deletes the record stored under this key.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted,
    /// a transaction-inactive error when the transaction is not active, a
    /// read-only error for a read-only transaction, and a data error when
    /// the key is invalid.
    pub fn delete(&self, key: Key) -> ClientResult<Arc<Request>> {
        self.check_writable("delete a record")?;
        let range = KeyRange::only(key)?;
        Ok(self
            .transaction
            .request_delete_record(self.identifier(), range))
    }

    /// Deletes every record whose key falls in the range.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`delete`](ObjectStore::delete).
    pub fn delete_range(&self, range: KeyRange) -> ClientResult<Arc<Request>> {
        self.check_writable("delete a record")?;
        Ok(self
            .transaction
            .request_delete_record(self.identifier(), range))
    }

    /// Deletes every record in the store.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted,
    /// a transaction-inactive error when the transaction is not active,
    /// and a read-only error for a read-only transaction.
    pub fn clear(&self) -> ClientResult<Arc<Request>> {
        self.check_writable("clear the store")?;
        Ok(self
            .transaction
            .request_clear_object_store(self.identifier()))
    }

    /// Counts records stored under this key.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted,
    /// a transaction-inactive error when the transaction is not active,
    /// and a data error when the key is invalid.
    pub fn count(&self, key: Key) -> ClientResult<Arc<Request>> {
        self.check_readable("count records")?;
        let range = KeyRange::only(key)?;
        Ok(self
            .transaction
            .request_count(self.identifier(), None, range))
    }

    /// Counts records whose key falls in the range.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted
    /// and a transaction-inactive error when the transaction is not
    /// active.
    pub fn count_range(&self, range: KeyRange) -> ClientResult<Arc<Request>> {
        self.check_readable("count records")?;
        Ok(self
            .transaction
            .request_count(self.identifier(), None, range))
    }

    /// Opens a cursor over records whose keys fall in the range.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted
    /// and a transaction-inactive error when the transaction is not
    /// active.
    pub fn open_cursor(
        &self,
        range: KeyRange,
        direction: CursorDirection,
    ) -> ClientResult<Arc<Request>> {
        self.check_readable("open a cursor")?;
        Ok(self
            .transaction
            .request_open_cursor(self.identifier(), range, direction))
    }

    fn check_readable(&self, verb: &str) -> ClientResult<()> {
        self.transaction.database().assert_origin_thread();
        if self.is_deleted() {
            return Err(ClientError::invalid_state(format!(
                "cannot {verb}: the object store has been deleted"
            )));
        }
        if !self.transaction.is_active() {
            return Err(ClientError::transaction_inactive(format!(
                "cannot {verb}: the transaction is inactive or finished"
            )));
        }
        Ok(())
    }

    fn check_writable(&self, verb: &str) -> ClientResult<()> {
        self.check_readable(verb)?;
        if self.transaction.is_read_only() {
            return Err(ClientError::read_only(format!(
                "cannot {verb} in a read-only transaction"
            )));
        }
        Ok(())
    }

    /// Creates an index over the store and returns its handle.
    ///
    /// Preconditions, checked in order: store not deleted (invalid state),
    /// version-change transaction (invalid state), transaction active
    /// (transaction inactive), key path well formed (syntax), name
    /// non-empty (type), name unused (constraint), and no multi-entry over
    /// an array key path (invalid access).
    pub fn create_index(
        &self,
        name: &str,
        key_path: KeyPath,
        parameters: IndexParameters,
    ) -> ClientResult<Arc<Index>> {
        let database = self.transaction.database();
        database.assert_origin_thread();

        if self.is_deleted() {
            return Err(ClientError::invalid_state(
                "cannot create an index: the object store has been deleted",
            ));
        }
        if !self.transaction.is_version_change() {
            return Err(ClientError::invalid_state(
                "cannot create an index outside a version-change transaction",
            ));
        }
        if !self.transaction.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot create an index: the transaction is inactive or finished",
            ));
        }
        if !key_path.is_valid() {
            return Err(ClientError::syntax("the key path is malformed"));
        }
        if name.is_empty() {
            return Err(ClientError::type_error("an index requires a name"));
        }
        if self.info.lock().has_index(name) {
            return Err(ClientError::constraint(format!(
                "an index named '{name}' already exists"
            )));
        }
        if parameters.multi_entry && matches!(key_path, KeyPath::Array(_)) {
            return Err(ClientError::invalid_access(
                "a multi-entry index cannot use an array key path",
            ));
        }

        let info = self
            .info
            .lock()
            .create_new_index(name, key_path, parameters);
        database.did_create_index_info(&info);
        debug!(store = %self.identifier(), index = name, "create_index");

        let handle = Index::new(info.clone(), &self.arc_self()?);
        self.indexes.insert(Arc::clone(&handle));
        let _request = self.transaction.request_create_index(info);
        Ok(handle)
    }

    /// Deletes an index from the store.
    ///
    /// Preconditions, checked in order: store not deleted (invalid state),
    /// version-change transaction (invalid state), transaction active
    /// (transaction inactive), index exists (not found).
    pub fn delete_index(&self, name: &str) -> ClientResult<()> {
        let database = self.transaction.database();
        database.assert_origin_thread();

        if self.is_deleted() {
            return Err(ClientError::invalid_state(
                "cannot delete an index: the object store has been deleted",
            ));
        }
        if !self.transaction.is_version_change() {
            return Err(ClientError::invalid_state(
                "cannot delete an index outside a version-change transaction",
            ));
        }
        if !self.transaction.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot delete an index: the transaction is inactive or finished",
            ));
        }
        let info = {
            let mut store_info = self.info.lock();
            let info = store_info
                .info_for_existing_index(name)
                .cloned()
                .ok_or_else(|| {
                    ClientError::not_found(format!("no index named '{name}'"))
                })?;
            store_info.delete_index(name);
            info
        };
        database.did_delete_index_info(&info);
        self.indexes.take_and_mark_deleted(name);
        debug!(store = %self.identifier(), index = name, "delete_index");

        let _request = self
            .transaction
            .request_delete_index(self.identifier(), info.identifier());
        Ok(())
    }

    /// Returns a handle for an existing index.
    ///
    /// Repeated calls with the same name return the same handle. Handles
    /// for deleted indexes are never returned; the name reports not found
    /// once deleted.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the store has been deleted
    /// or the transaction has finished, and a not-found error when no
    /// index has this name.
    pub fn index(&self, name: &str) -> ClientResult<Arc<Index>> {
        self.transaction.database().assert_origin_thread();

        if self.is_deleted() {
            return Err(ClientError::invalid_state(
                "cannot look up an index: the object store has been deleted",
            ));
        }
        if self.transaction.is_finished_or_finishing() {
            return Err(ClientError::invalid_state(
                "cannot look up an index: the transaction is finished",
            ));
        }
        if let Some(index) = self.indexes.lookup(name) {
            return Ok(index);
        }
        let info = self
            .info
            .lock()
            .info_for_existing_index(name)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("no index named '{name}'")))?;
        let handle = Index::new(info, &self.arc_self()?);
        self.indexes.insert(Arc::clone(&handle));
        Ok(handle)
    }

    /// Visits every live index handle this store has vended.
    pub fn visit_referenced_indexes(&self, visitor: impl FnMut(&Arc<Index>)) {
        self.indexes.visit_live(visitor);
    }

    /// Restores the store to its state before an aborted version change.
    ///
    /// A store created inside the aborted transaction is marked deleted;
    /// one that predates it gets its metadata snapshot back, and handles
    /// for indexes created inside the transaction are marked deleted. The
    /// restore copies values, so repeating it is harmless.
    pub(crate) fn rollback_for_version_change_abort(&self) {
        if self.created_in_transaction {
            self.mark_as_deleted();
            return;
        }
        let surviving = self.original_info.index_names();
        *self.info.lock() = self.original_info.clone();
        self.indexes.retain_only(&surviving);
    }

    fn arc_self(&self) -> ClientResult<Arc<ObjectStore>> {
        let identifier = self.identifier();
        self.transaction
            .store_by_identifier(identifier)
            .ok_or_else(|| {
                ClientError::invalid_state("the object store handle is no longer registered")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::schema::DatabaseInfo;
    use crate::server::memory::MemoryServer;
    use crate::transaction::TransactionMode;

    fn open() -> Arc<Database> {
        Database::new(
            DatabaseInfo::new("app", 1),
            Box::new(MemoryServer::new()),
            false,
        )
    }

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn deleted_store_wins_over_inactive_transaction() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, true)
            .unwrap();

        store.mark_as_deleted();
        transaction.deactivate();

        for result in [
            store.get(Key::Number(1.0)).err(),
            store.put(Value::Null, None).err(),
            store.delete(Key::Number(1.0)).err(),
            store.clear().err(),
            store.count_range(KeyRange::all()).err(),
        ] {
            assert!(matches!(result, Some(ClientError::InvalidState { .. })));
        }
    }

    #[test]
    fn inactive_transaction_rejects_operations() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, true)
            .unwrap();

        transaction.deactivate();
        let result = store.put(Value::Null, None);
        assert!(matches!(
            result,
            Err(ClientError::TransactionInactive { .. })
        ));
    }

    #[test]
    fn in_line_key_store_rejects_explicit_keys() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(
                &transaction,
                "users",
                Some(KeyPath::Single("id".into())),
                false,
            )
            .unwrap();

        let value = map(&[("id", Value::Number(1.0))]);
        let result = store.put(value, Some(Key::Number(2.0)));
        assert!(matches!(result, Err(ClientError::Data { .. })));
    }

    #[test]
    fn in_line_key_store_without_generator_needs_an_extractable_key() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(
                &transaction,
                "users",
                Some(KeyPath::Single("id".into())),
                false,
            )
            .unwrap();

        let missing = map(&[("name", Value::Text("ada".into()))]);
        assert!(matches!(
            store.put(missing, None),
            Err(ClientError::Data { .. })
        ));

        let unusable = map(&[("id", Value::Bool(true))]);
        assert!(matches!(
            store.put(unusable, None),
            Err(ClientError::Data { .. })
        ));
    }

    #[test]
    fn out_of_line_store_without_generator_needs_an_explicit_key() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, false)
            .unwrap();

        assert!(matches!(
            store.put(Value::Null, None),
            Err(ClientError::Data { .. })
        ));
        assert!(store.put(Value::Null, Some(Key::Number(1.0))).is_ok());
    }

    #[test]
    fn invalid_explicit_key_is_a_data_error() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, false)
            .unwrap();

        let result = store.put(Value::Null, Some(Key::Number(f64::NAN)));
        assert!(matches!(result, Err(ClientError::Data { .. })));
    }

    #[test]
    fn create_index_requires_version_change() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let _store = database
            .create_object_store(&transaction, "users", None, true)
            .unwrap();
        transaction.commit().unwrap();

        let read = database
            .transaction(&["users"], TransactionMode::ReadWrite)
            .unwrap();
        let store = read.object_store("users").unwrap();
        let result = store.create_index(
            "by_name",
            KeyPath::Single("name".into()),
            IndexParameters::default(),
        );
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));
    }

    #[test]
    fn create_index_precondition_order() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, true)
            .unwrap();

        store
            .create_index(
                "by_name",
                KeyPath::Single("name".into()),
                IndexParameters::default(),
            )
            .unwrap();

        // Duplicate name.
        assert!(matches!(
            store.create_index(
                "by_name",
                KeyPath::Single("name".into()),
                IndexParameters::default()
            ),
            Err(ClientError::Constraint { .. })
        ));

        // Malformed key path is reported before the duplicate name.
        assert!(matches!(
            store.create_index(
                "by_name",
                KeyPath::Single("1bad".into()),
                IndexParameters::default()
            ),
            Err(ClientError::Syntax { .. })
        ));

        // Empty name.
        assert!(matches!(
            store.create_index("", KeyPath::Single("x".into()), IndexParameters::default()),
            Err(ClientError::Type { .. })
        ));

        // Multi-entry over an array key path.
        assert!(matches!(
            store.create_index(
                "compound",
                KeyPath::Array(vec!["a".into(), "b".into()]),
                IndexParameters {
                    unique: false,
                    multi_entry: true
                }
            ),
            Err(ClientError::InvalidAccess { .. })
        ));
    }

    #[test]
    fn deleted_index_name_reports_not_found() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, true)
            .unwrap();

        let index = store
            .create_index(
                "by_name",
                KeyPath::Single("name".into()),
                IndexParameters::default(),
            )
            .unwrap();
        store.delete_index("by_name").unwrap();

        assert!(index.is_deleted());
        assert!(matches!(
            store.index("by_name"),
            Err(ClientError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_index("by_name"),
            Err(ClientError::NotFound { .. })
        ));
    }

    #[test]
    fn repeated_version_change_rollback_is_a_noop() {
        let database = open();
        let first = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        database
            .create_object_store(&first, "users", None, true)
            .unwrap();
        first.commit().unwrap();

        let second = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let survivor = second.object_store("users").unwrap();
        survivor
            .create_index(
                "by_name",
                KeyPath::Single("name".into()),
                IndexParameters::default(),
            )
            .unwrap();
        let doomed = database
            .create_object_store(&second, "drafts", None, true)
            .unwrap();
        second.abort().unwrap();

        assert!(!survivor.is_deleted());
        assert!(doomed.is_deleted());
        assert!(survivor.info().index_names().is_empty());

        survivor.rollback_for_version_change_abort();
        doomed.rollback_for_version_change_abort();

        assert!(!survivor.is_deleted());
        assert!(doomed.is_deleted());
        assert!(survivor.info().index_names().is_empty());
    }

    #[test]
    fn index_lookup_returns_the_same_handle() {
        let database = open();
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let store = database
            .create_object_store(&transaction, "users", None, true)
            .unwrap();
        let created = store
            .create_index(
                "by_name",
                KeyPath::Single("name".into()),
                IndexParameters::default(),
            )
            .unwrap();
        let looked_up = store.index("by_name").unwrap();
        assert!(Arc::ptr_eq(&created, &looked_up));
    }
}
