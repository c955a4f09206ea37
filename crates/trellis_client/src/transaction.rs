//! Transaction lifecycle and the per-transaction operation queue.

use crate::database::Database;
use crate::error::{ClientError, ClientResult};
use crate::key_range::KeyRange;
use crate::object_store::ObjectStore;
use crate::request::{Request, RequestResult};
use crate::schema::IndexInfo;
use crate::types::{
    CursorIdentifier, IndexIdentifier, ObjectStoreIdentifier, ResourceIdentifier,
    TransactionIdentifier,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use trellis_codec::{Key, SerializedValue};

/// Access mode a transaction was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Reads only; mutating operations are rejected synchronously.
    ReadOnly,
    /// Reads and record mutations.
    ReadWrite,
    /// Schema changes in addition to reads and writes. At most one per
    /// database connection at a time.
    VersionChange,
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting new operations.
    Active,
    /// Alive but not accepting new operations until reactivated.
    Inactive,
    /// Commit has started; no further operations or aborts.
    Committing,
    /// Committed or aborted.
    Finished,
}

/// Whether a write may replace an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    /// Fail with a constraint error if the key already exists.
    NoOverwrite,
    /// Replace any existing record under the key.
    Overwrite,
    /// Replace the record at a cursor's current position.
    OverwriteForCursor,
}

/// Traversal direction for cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDirection {
    /// Ascending key order.
    Next,
    /// Ascending key order, one entry per distinct key.
    NextUnique,
    /// Descending key order.
    Previous,
    /// Descending key order, one entry per distinct key.
    PreviousUnique,
}

#[derive(Debug)]
enum OperationKind {
    GetRecord {
        store: ObjectStoreIdentifier,
        range: KeyRange,
    },
    PutOrAdd {
        store: ObjectStoreIdentifier,
        key: Option<Key>,
        value: SerializedValue,
        overwrite: OverwriteMode,
    },
    DeleteRecord {
        store: ObjectStoreIdentifier,
        range: KeyRange,
    },
    ClearObjectStore {
        store: ObjectStoreIdentifier,
    },
    Count {
        store: ObjectStoreIdentifier,
        index: Option<IndexIdentifier>,
        range: KeyRange,
    },
    CreateIndex {
        info: IndexInfo,
    },
    DeleteIndex {
        store: ObjectStoreIdentifier,
        index: IndexIdentifier,
    },
    OpenCursor {
        store: ObjectStoreIdentifier,
        range: KeyRange,
        direction: CursorDirection,
    },
    IterateCursor {
        cursor: CursorIdentifier,
        count: u32,
    },
}

#[derive(Debug)]
struct Operation {
    kind: OperationKind,
    request: Arc<Request>,
}

/// A unit of work against the database, with its own operation queue.
///
/// Operations enqueue in call order and dispatch in the same order, so
/// two writes to one key settle by last-writer-wins within a transaction.
/// Enqueued operations are performed by [`dispatch_pending`], which the
/// owner pumps between activations.
///
/// [`dispatch_pending`]: Transaction::dispatch_pending
#[derive(Debug)]
pub struct Transaction {
    identifier: TransactionIdentifier,
    mode: TransactionMode,
    database: Arc<Database>,
    state: Mutex<TransactionState>,
    next_resource: AtomicU64,
    operations: Mutex<VecDeque<Operation>>,
    stores: Mutex<Vec<Weak<ObjectStore>>>,
}

impl Transaction {
    pub(crate) fn new(
        identifier: TransactionIdentifier,
        mode: TransactionMode,
        database: Arc<Database>,
    ) -> Arc<Transaction> {
        Arc::new(Transaction {
            identifier,
            mode,
            database,
            state: Mutex::new(TransactionState::Active),
            next_resource: AtomicU64::new(1),
            operations: Mutex::new(VecDeque::new()),
            stores: Mutex::new(Vec::new()),
        })
    }

    /// Returns the transaction identifier.
    #[must_use]
    pub fn identifier(&self) -> TransactionIdentifier {
        self.identifier
    }

    /// Returns the access mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Returns the owning database.
    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Returns true if the transaction accepts new operations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Returns true if the transaction has committed or aborted, or a
    /// commit is underway.
    #[must_use]
    pub fn is_finished_or_finishing(&self) -> bool {
        matches!(
            self.state(),
            TransactionState::Committing | TransactionState::Finished
        )
    }

    /// Returns true for a read-only transaction.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mode == TransactionMode::ReadOnly
    }

    /// Returns true for a version-change transaction.
    #[must_use]
    pub fn is_version_change(&self) -> bool {
        self.mode == TransactionMode::VersionChange
    }

    /// Marks the transaction as accepting operations again.
    pub fn activate(&self) {
        let mut state = self.state.lock();
        if *state == TransactionState::Inactive {
            *state = TransactionState::Active;
        }
    }

    /// Stops accepting new operations until the next activation.
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        if *state == TransactionState::Active {
            *state = TransactionState::Inactive;
        }
    }

    fn next_resource_identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.next_resource.fetch_add(1, Ordering::Relaxed))
    }

    fn enqueue(self: &Arc<Self>, kind: OperationKind) -> Arc<Request> {
        let request = Request::new(self.next_resource_identifier(), self);
        self.operations.lock().push_back(Operation {
            kind,
            request: Arc::clone(&request),
        });
        request
    }

    pub(crate) fn request_get_record(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
        range: KeyRange,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::GetRecord { store, range })
    }

    pub(crate) fn request_put_or_add(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
        key: Option<Key>,
        value: SerializedValue,
        overwrite: OverwriteMode,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::PutOrAdd {
            store,
            key,
            value,
            overwrite,
        })
    }

    pub(crate) fn request_delete_record(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
        range: KeyRange,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::DeleteRecord { store, range })
    }

    pub(crate) fn request_clear_object_store(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::ClearObjectStore { store })
    }

    pub(crate) fn request_count(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
        index: Option<IndexIdentifier>,
        range: KeyRange,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::Count {
            store,
            index,
            range,
        })
    }

    pub(crate) fn request_create_index(self: &Arc<Self>, info: IndexInfo) -> Arc<Request> {
        self.enqueue(OperationKind::CreateIndex { info })
    }

    pub(crate) fn request_delete_index(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
        index: IndexIdentifier,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::DeleteIndex { store, index })
    }

    pub(crate) fn request_open_cursor(
        self: &Arc<Self>,
        store: ObjectStoreIdentifier,
        range: KeyRange,
        direction: CursorDirection,
    ) -> Arc<Request> {
        self.enqueue(OperationKind::OpenCursor {
            store,
            range,
            direction,
        })
    }

    /// Advances a cursor request to its next position.
    ///
    /// The request must be a successfully completed cursor request; its
    /// handle is consumed and the same request completes again once the
    /// iteration operation dispatches.
    ///
    /// # Errors
    ///
    /// Fails with a transaction-inactive error when the transaction is
    /// not active, and an invalid-state error when the request holds no
    /// cursor position to advance.
    pub fn iterate_cursor(
        self: &Arc<Self>,
        request: &Arc<Request>,
        count: u32,
    ) -> ClientResult<()> {
        self.database.assert_origin_thread();
        if !self.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot iterate a cursor while the transaction is inactive",
            ));
        }
        let handle = request.take_cursor_for_iteration().ok_or_else(|| {
            ClientError::invalid_state("the request holds no cursor position to advance")
        })?;
        self.operations.lock().push_back(Operation {
            kind: OperationKind::IterateCursor {
                cursor: handle.cursor,
                count,
            },
            request: Arc::clone(request),
        });
        Ok(())
    }

    /// Returns an operation handle for a store in this transaction's scope.
    ///
    /// Repeated calls with the same name return the same handle while the
    /// caller keeps it alive.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the transaction has
    /// finished, and a not-found error when no store has this name.
    pub fn object_store(self: &Arc<Self>, name: &str) -> ClientResult<Arc<ObjectStore>> {
        self.database.assert_origin_thread();
        if self.is_finished_or_finishing() {
            return Err(ClientError::invalid_state(
                "the transaction has finished",
            ));
        }
        {
            let stores = self.stores.lock();
            for weak in stores.iter() {
                if let Some(store) = weak.upgrade() {
                    if store.info().name() == name && !store.is_deleted() {
                        return Ok(store);
                    }
                }
            }
        }
        let info = self
            .database
            .info()
            .object_store_named(name)
            .cloned()
            .ok_or_else(|| {
                ClientError::not_found(format!("no object store named '{name}'"))
            })?;
        let store = ObjectStore::new(info, self, false);
        self.stores.lock().push(Arc::downgrade(&store));
        Ok(store)
    }

    pub(crate) fn register_store(&self, store: &Arc<ObjectStore>) {
        self.stores.lock().push(Arc::downgrade(store));
    }

    pub(crate) fn store_by_identifier(
        &self,
        identifier: ObjectStoreIdentifier,
    ) -> Option<Arc<ObjectStore>> {
        let stores = self.stores.lock();
        stores
            .iter()
            .filter_map(Weak::upgrade)
            .find(|store| store.identifier() == identifier)
    }

    /// Performs every enqueued operation, in order, completing each
    /// request as it settles. Returns the number of operations performed.
    ///
    /// A failed schema operation aborts the whole transaction after its
    /// request completes with the failure.
    pub fn dispatch_pending(self: &Arc<Self>) -> usize {
        let mut dispatched = 0;
        loop {
            let Some(operation) = self.operations.lock().pop_front() else {
                break;
            };
            dispatched += 1;
            let schema_failure = self.perform(operation);
            if schema_failure {
                warn!(transaction = %self.identifier, "schema operation failed, aborting");
                if let Err(error) = self.abort() {
                    debug!(transaction = %self.identifier, %error, "abort after schema failure");
                }
                break;
            }
        }
        dispatched
    }

    /// Performs one operation. Returns true when a failed schema change
    /// must abort the transaction.
    fn perform(&self, operation: Operation) -> bool {
        let Operation { kind, request } = operation;
        match kind {
            OperationKind::GetRecord { store, range } => {
                match self.database.with_server(|server| server.get_record(store, &range)) {
                    Ok(value) => request.complete_with_result(RequestResult::Value(value)),
                    Err(error) => request.complete_with_error(error),
                };
            }
            OperationKind::PutOrAdd {
                store,
                key,
                value,
                overwrite,
            } => {
                match self
                    .database
                    .with_server(|server| server.put_or_add(store, key, &value, overwrite))
                {
                    Ok(key) => request.complete_with_result(RequestResult::Key(key)),
                    Err(error) => request.complete_with_error(error),
                };
            }
            OperationKind::DeleteRecord { store, range } => {
                match self
                    .database
                    .with_server(|server| server.delete_record(store, &range))
                {
                    Ok(()) => request.complete_with_result(RequestResult::Undefined),
                    Err(error) => request.complete_with_error(error),
                };
            }
            OperationKind::ClearObjectStore { store } => {
                match self
                    .database
                    .with_server(|server| server.clear_object_store(store))
                {
                    Ok(()) => request.complete_with_result(RequestResult::Undefined),
                    Err(error) => request.complete_with_error(error),
                };
            }
            OperationKind::Count {
                store,
                index,
                range,
            } => {
                match self
                    .database
                    .with_server(|server| server.count(store, index, &range))
                {
                    Ok(count) => request.complete_with_result(RequestResult::Count(count)),
                    Err(error) => request.complete_with_error(error),
                };
            }
            OperationKind::CreateIndex { info } => {
                match self.database.with_server(|server| server.create_index(&info)) {
                    Ok(()) => {
                        request.complete_with_result(RequestResult::Undefined);
                    }
                    Err(error) => {
                        request.complete_with_error(error);
                        return true;
                    }
                }
            }
            OperationKind::DeleteIndex { store, index } => {
                match self
                    .database
                    .with_server(|server| server.delete_index(store, index))
                {
                    Ok(()) => {
                        request.complete_with_result(RequestResult::Undefined);
                    }
                    Err(error) => {
                        request.complete_with_error(error);
                        return true;
                    }
                }
            }
            OperationKind::OpenCursor {
                store,
                range,
                direction,
            } => {
                match self
                    .database
                    .with_server(|server| server.open_cursor(store, &range, direction))
                {
                    Ok(handle) => request.complete_with_result(RequestResult::Cursor(handle)),
                    Err(error) => request.complete_with_error(error),
                };
            }
            OperationKind::IterateCursor { cursor, count } => {
                match self
                    .database
                    .with_server(|server| server.iterate_cursor(cursor, count))
                {
                    Ok(handle) => request.complete_with_result(RequestResult::Cursor(handle)),
                    Err(error) => request.complete_with_error(error),
                };
            }
        }
        false
    }

    /// Commits the transaction after performing any remaining operations.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the transaction has already
    /// finished or a commit is underway.
    pub fn commit(self: &Arc<Self>) -> ClientResult<()> {
        self.database.assert_origin_thread();
        {
            let mut state = self.state.lock();
            match *state {
                TransactionState::Committing | TransactionState::Finished => {
                    return Err(ClientError::invalid_state(
                        "the transaction has already finished",
                    ));
                }
                _ => *state = TransactionState::Committing,
            }
        }
        self.dispatch_pending_for_commit();
        *self.state.lock() = TransactionState::Finished;
        if self.is_version_change() {
            self.database.did_commit_version_change();
        }
        debug!(transaction = %self.identifier, "committed");
        Ok(())
    }

    fn dispatch_pending_for_commit(self: &Arc<Self>) {
        loop {
            let Some(operation) = self.operations.lock().pop_front() else {
                break;
            };
            // Schema failures during commit still fail their request, but
            // the commit itself proceeds with the remaining operations
            // already rejected by the server.
            self.perform(operation);
        }
    }

    /// Aborts the transaction, failing every undispatched operation.
    ///
    /// A version-change abort restores the schema to its state before the
    /// transaction started.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the transaction has already
    /// finished or a commit is underway.
    pub fn abort(&self) -> ClientResult<()> {
        self.database.assert_origin_thread();
        {
            let mut state = self.state.lock();
            match *state {
                TransactionState::Committing | TransactionState::Finished => {
                    return Err(ClientError::invalid_state(
                        "cannot abort a finished transaction",
                    ));
                }
                _ => *state = TransactionState::Finished,
            }
        }
        let pending: Vec<Operation> = self.operations.lock().drain(..).collect();
        for operation in pending {
            operation
                .request
                .complete_with_error(ClientError::unknown("the transaction was aborted"));
        }
        if self.is_version_change() {
            let stores = self.stores.lock();
            for weak in stores.iter() {
                if let Some(store) = weak.upgrade() {
                    store.rollback_for_version_change_abort();
                }
            }
            drop(stores);
            self.database.did_abort_version_change();
        }
        debug!(transaction = %self.identifier, "aborted");
        Ok(())
    }
}
