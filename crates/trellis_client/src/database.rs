//! Connection-side database handle.

use crate::error::{ClientError, ClientResult};
use crate::object_store::ObjectStore;
use crate::schema::{DatabaseInfo, IndexInfo, ObjectStoreInfo};
use crate::server::StoreServer;
use crate::transaction::{Transaction, TransactionMode};
use crate::types::{ObjectStoreIdentifier, TransactionIdentifier};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::debug;
use trellis_codec::KeyPath;

/// One connection to a database, owning its schema view and its link to
/// the backing store.
///
/// The handle is bound to the thread that opened it; operations from
/// other threads are a caller bug caught in debug builds.
pub struct Database {
    info: Mutex<DatabaseInfo>,
    previous_info: Mutex<Option<DatabaseInfo>>,
    server: Mutex<Box<dyn StoreServer>>,
    origin_thread: ThreadId,
    ephemeral: bool,
    live_context: AtomicBool,
    next_transaction: AtomicU64,
    next_object_store: AtomicU64,
    version_change_transaction: Mutex<Weak<Transaction>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.info.lock();
        f.debug_struct("Database")
            .field("name", &info.name())
            .field("version", &info.version())
            .field("ephemeral", &self.ephemeral)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens a connection over the given backing store.
    #[must_use]
    pub fn new(info: DatabaseInfo, server: Box<dyn StoreServer>, ephemeral: bool) -> Arc<Database> {
        Arc::new(Database {
            info: Mutex::new(info),
            previous_info: Mutex::new(None),
            server: Mutex::new(server),
            origin_thread: thread::current().id(),
            ephemeral,
            live_context: AtomicBool::new(true),
            next_transaction: AtomicU64::new(1),
            next_object_store: AtomicU64::new(1),
            version_change_transaction: Mutex::new(Weak::new()),
        })
    }

    /// Returns a snapshot of the connection's schema view.
    #[must_use]
    pub fn info(&self) -> DatabaseInfo {
        self.info.lock().clone()
    }

    /// Returns the schema as it was before the in-flight version change,
    /// if one is in flight.
    #[must_use]
    pub fn previous_info(&self) -> Option<DatabaseInfo> {
        self.previous_info.lock().clone()
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> String {
        self.info.lock().name().to_string()
    }

    /// Returns the current version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.info.lock().version()
    }

    /// Returns true when the connection was opened in an ephemeral
    /// session, where blob references must not be persisted.
    #[must_use]
    pub fn is_ephemeral_session(&self) -> bool {
        self.ephemeral
    }

    /// Returns true while the connection has a live execution context.
    #[must_use]
    pub fn has_live_context(&self) -> bool {
        self.live_context.load(Ordering::Acquire)
    }

    /// Marks the execution context live or stopped. Operations that must
    /// capture results refuse to start without a live context.
    pub fn set_live_context(&self, live: bool) {
        self.live_context.store(live, Ordering::Release);
    }

    pub(crate) fn assert_origin_thread(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.origin_thread,
            "database used off its origin thread"
        );
    }

    pub(crate) fn with_server<R>(&self, f: impl FnOnce(&mut dyn StoreServer) -> R) -> R {
        let mut server = self.server.lock();
        f(server.as_mut())
    }

    fn version_change_in_progress(&self) -> bool {
        self.version_change_transaction
            .lock()
            .upgrade()
            .is_some_and(|transaction| !transaction.is_finished_or_finishing())
    }

    /// Starts a transaction over the named stores.
    ///
    /// A version-change transaction takes an empty scope, bumps the
    /// version, and snapshots the schema for rollback on abort. Only one
    /// may be in flight per connection.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error while a version change is in
    /// flight, an invalid-access error for an empty scope outside a
    /// version change, and a not-found error when a scoped store does not
    /// exist.
    pub fn transaction(
        self: &Arc<Self>,
        scope: &[&str],
        mode: TransactionMode,
    ) -> ClientResult<Arc<Transaction>> {
        self.assert_origin_thread();

        if self.version_change_in_progress() {
            return Err(ClientError::invalid_state(
                "a version change transaction is in progress",
            ));
        }
        if mode == TransactionMode::VersionChange {
            let transaction = self.start_transaction(mode);
            self.will_start_version_change(&transaction);
            return Ok(transaction);
        }
        if scope.is_empty() {
            return Err(ClientError::invalid_access(
                "a transaction requires at least one object store in scope",
            ));
        }
        {
            let info = self.info.lock();
            for name in scope {
                if !info.has_object_store(name) {
                    return Err(ClientError::not_found(format!(
                        "no object store named '{name}'"
                    )));
                }
            }
        }
        Ok(self.start_transaction(mode))
    }

    fn start_transaction(self: &Arc<Self>, mode: TransactionMode) -> Arc<Transaction> {
        let identifier =
            TransactionIdentifier::new(self.next_transaction.fetch_add(1, Ordering::Relaxed));
        debug!(transaction = %identifier, ?mode, "start transaction");
        Transaction::new(identifier, mode, Arc::clone(self))
    }

    fn will_start_version_change(&self, transaction: &Arc<Transaction>) {
        let mut info = self.info.lock();
        *self.previous_info.lock() = Some(info.clone());
        let next_version = info.version() + 1;
        info.set_version(next_version);
        *self.version_change_transaction.lock() = Arc::downgrade(transaction);
    }

    pub(crate) fn did_commit_version_change(&self) {
        *self.previous_info.lock() = None;
        *self.version_change_transaction.lock() = Weak::new();
        debug!(version = self.version(), "version change committed");
    }

    pub(crate) fn did_abort_version_change(&self) {
        if let Some(previous) = self.previous_info.lock().take() {
            *self.info.lock() = previous;
        }
        *self.version_change_transaction.lock() = Weak::new();
        debug!(version = self.version(), "version change rolled back");
    }

    /// Creates an object store inside a version-change transaction and
    /// returns its operation handle.
    ///
    /// Preconditions, checked in order: version-change transaction
    /// (invalid state), transaction active (transaction inactive), key
    /// path well formed (syntax), no key generator over an empty key path
    /// (invalid access), name unused (constraint).
    pub fn create_object_store(
        self: &Arc<Self>,
        transaction: &Arc<Transaction>,
        name: &str,
        key_path: Option<KeyPath>,
        auto_increment: bool,
    ) -> ClientResult<Arc<ObjectStore>> {
        self.assert_origin_thread();

        if !transaction.is_version_change() {
            return Err(ClientError::invalid_state(
                "cannot create an object store outside a version-change transaction",
            ));
        }
        if !transaction.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot create an object store: the transaction is inactive or finished",
            ));
        }
        if let Some(key_path) = &key_path {
            if !key_path.is_valid() {
                return Err(ClientError::syntax("the key path is malformed"));
            }
            let empty_single = matches!(key_path, KeyPath::Single(path) if path.is_empty());
            if auto_increment && empty_single {
                return Err(ClientError::invalid_access(
                    "a key generator cannot target the value itself",
                ));
            }
        }
        if self.info.lock().has_object_store(name) {
            return Err(ClientError::constraint(format!(
                "an object store named '{name}' already exists"
            )));
        }

        let identifier =
            ObjectStoreIdentifier::new(self.next_object_store.fetch_add(1, Ordering::Relaxed));
        let info = ObjectStoreInfo::new(identifier, name, key_path, auto_increment);
        self.with_server(|server| server.register_object_store(&info))?;
        self.info.lock().add_object_store(info.clone());
        debug!(store = %identifier, name, "create object store");

        let store = ObjectStore::new(info, transaction, true);
        transaction.register_store(&store);
        Ok(store)
    }

    /// Deletes an object store inside a version-change transaction.
    ///
    /// Preconditions, checked in order: version-change transaction
    /// (invalid state), transaction active (transaction inactive), store
    /// exists (not found).
    pub fn delete_object_store(
        self: &Arc<Self>,
        transaction: &Arc<Transaction>,
        name: &str,
    ) -> ClientResult<()> {
        self.assert_origin_thread();

        if !transaction.is_version_change() {
            return Err(ClientError::invalid_state(
                "cannot delete an object store outside a version-change transaction",
            ));
        }
        if !transaction.is_active() {
            return Err(ClientError::transaction_inactive(
                "cannot delete an object store: the transaction is inactive or finished",
            ));
        }
        let identifier = {
            let info = self.info.lock();
            info.object_store_named(name)
                .map(ObjectStoreInfo::identifier)
                .ok_or_else(|| {
                    ClientError::not_found(format!("no object store named '{name}'"))
                })?
        };

        if let Some(store) = transaction.store_by_identifier(identifier) {
            store.mark_as_deleted();
        }
        self.info.lock().remove_object_store(identifier);
        self.with_server(|server| server.delete_object_store(identifier))?;
        debug!(store = %identifier, name, "delete object store");
        Ok(())
    }

    pub(crate) fn did_create_index_info(&self, info: &IndexInfo) {
        self.info.lock().did_create_index(info);
    }

    pub(crate) fn did_delete_index_info(&self, info: &IndexInfo) {
        self.info.lock().did_delete_index(info);
    }
}
