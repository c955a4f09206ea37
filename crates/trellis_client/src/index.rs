//! Index handles and the per-store index registry.

use crate::error::{ClientError, ClientResult};
use crate::key_range::KeyRange;
use crate::object_store::ObjectStore;
use crate::request::Request;
use crate::schema::IndexInfo;
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Operation handle for one index of an object store.
///
/// The handle stays valid for the lifetime of its transaction; once the
/// index is deleted, operations on it fail with an invalid-state error.
#[derive(Debug)]
pub struct Index {
    info: IndexInfo,
    transaction: Arc<Transaction>,
    object_store: Weak<ObjectStore>,
    deleted: AtomicBool,
}

impl Index {
    pub(crate) fn new(info: IndexInfo, object_store: &Arc<ObjectStore>) -> Arc<Index> {
        Arc::new(Index {
            info,
            transaction: Arc::clone(object_store.transaction()),
            object_store: Arc::downgrade(object_store),
            deleted: AtomicBool::new(false),
        })
    }

    /// Returns the index metadata this handle was created with.
    #[must_use]
    pub fn info(&self) -> &IndexInfo {
        &self.info
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Returns true once the index has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_as_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    fn check_usable(&self, verb: &str) -> ClientResult<Arc<ObjectStore>> {
        self.transaction.database().assert_origin_thread();
        let store = self.object_store.upgrade().ok_or_else(|| {
            ClientError::invalid_state(format!("cannot {verb}: the object store is gone"))
        })?;
        if self.is_deleted() || store.is_deleted() {
            return Err(ClientError::invalid_state(format!(
                "cannot {verb}: the index or its object store has been deleted"
            )));
        }
        if !self.transaction.is_active() {
            return Err(ClientError::transaction_inactive(format!(
                "cannot {verb}: the transaction is inactive or finished"
            )));
        }
        Ok(store)
    }

    /// Counts records whose index key falls in the range.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state error when the index or its store has
    /// been deleted, and a transaction-inactive error when the transaction
    /// is not active.
    pub fn count(&self, range: KeyRange) -> ClientResult<Arc<Request>> {
        let store = self.check_usable("count records")?;
        Ok(self.transaction.request_count(
            store.identifier(),
            Some(self.info.identifier()),
            range,
        ))
    }

}

/// Registry of index handles a store has vended.
///
/// Live handles are shared: looking up the same name twice returns the
/// same handle. Deleted handles are retained so outstanding references
/// observe the deletion rather than a dangling name.
#[derive(Debug, Default)]
pub(crate) struct IndexRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    live: HashMap<String, Arc<Index>>,
    deleted: Vec<Arc<Index>>,
}

impl IndexRegistry {
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<Index>> {
        self.inner.lock().live.get(name).map(Arc::clone)
    }

    pub(crate) fn insert(&self, index: Arc<Index>) {
        self.inner
            .lock()
            .live
            .insert(index.name().to_string(), index);
    }

    /// Removes a live handle, marks it deleted, and retains it.
    pub(crate) fn take_and_mark_deleted(&self, name: &str) {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.live.remove(name) {
            index.mark_as_deleted();
            inner.deleted.push(index);
        }
    }

    /// Visits every live handle. The registry lock is held for the
    /// duration of the visit, so visitors must not call back in.
    pub(crate) fn visit_live(&self, mut visitor: impl FnMut(&Arc<Index>)) {
        let inner = self.inner.lock();
        for index in inner.live.values() {
            visitor(index);
        }
    }

    /// Drops handles for indexes absent from the surviving names, marking
    /// them deleted for any outstanding references.
    pub(crate) fn retain_only(&self, surviving: &[String]) {
        let mut inner = self.inner.lock();
        let doomed: Vec<String> = inner
            .live
            .keys()
            .filter(|name| !surviving.contains(name))
            .cloned()
            .collect();
        for name in doomed {
            if let Some(index) = inner.live.remove(&name) {
                index.mark_as_deleted();
                inner.deleted.push(index);
            }
        }
    }
}
