//! Pending operation handles and their completion state machine.

use crate::error::ClientError;
use crate::transaction::Transaction;
use crate::types::{CursorIdentifier, ResourceIdentifier};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::warn;
use trellis_codec::{Key, Value};

/// A snapshot of a server-side cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorHandle {
    /// Identifier of the server-side cursor.
    pub cursor: CursorIdentifier,
    /// Key at the current position.
    pub key: Key,
    /// Value at the current position.
    pub value: Value,
}

/// Payload delivered when a request completes successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestResult {
    /// Completion with no payload (delete, clear, index maintenance).
    Undefined,
    /// A record key, as produced by put or add.
    Key(Key),
    /// A record count.
    Count(u64),
    /// A record value; `None` when no record matched.
    Value(Option<Value>),
    /// An open cursor positioned on a record, or `None` when the range
    /// held no records.
    Cursor(Option<CursorHandle>),
}

/// The final disposition of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation succeeded with this payload.
    Success(RequestResult),
    /// The server reported a failure.
    Failure(ClientError),
}

#[derive(Debug)]
enum RequestState {
    Pending,
    /// A cursor request whose handle was consumed for iteration; the next
    /// completion rebinds this request instead of allocating a new one.
    WaitingForCursor,
    Done(Outcome),
}

/// Handle correlating one enqueued operation with its eventual response.
///
/// A request transitions from pending to done exactly once. Cursor
/// requests may return to a waiting state when iterated, then complete
/// again with the next position; this rebinding reuses the same request
/// rather than allocating a new one per step.
#[derive(Debug)]
pub struct Request {
    resource_identifier: ResourceIdentifier,
    transaction: Weak<Transaction>,
    state: Mutex<RequestState>,
}

impl Request {
    pub(crate) fn new(
        resource_identifier: ResourceIdentifier,
        transaction: &Arc<Transaction>,
    ) -> Arc<Request> {
        Arc::new(Request {
            resource_identifier,
            transaction: Arc::downgrade(transaction),
            state: Mutex::new(RequestState::Pending),
        })
    }

    /// Returns the identifier correlating this request with its operation.
    #[must_use]
    pub fn resource_identifier(&self) -> ResourceIdentifier {
        self.resource_identifier
    }

    /// Returns the owning transaction, if it is still alive.
    #[must_use]
    pub fn transaction(&self) -> Option<Arc<Transaction>> {
        self.transaction.upgrade()
    }

    /// Returns true if the request has not yet completed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(
            *self.state.lock(),
            RequestState::Pending | RequestState::WaitingForCursor
        )
    }

    /// Returns the outcome, if the request has completed.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match &*self.state.lock() {
            RequestState::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Returns the success payload, if the request completed successfully.
    #[must_use]
    pub fn result(&self) -> Option<RequestResult> {
        match self.outcome() {
            Some(Outcome::Success(result)) => Some(result),
            _ => None,
        }
    }

    /// Returns the failure, if the request completed with an error.
    #[must_use]
    pub fn error(&self) -> Option<ClientError> {
        match self.outcome() {
            Some(Outcome::Failure(error)) => Some(error),
            _ => None,
        }
    }

    /// Returns true while this request still awaits server activity.
    ///
    /// A request whose transaction has already been dropped can never
    /// complete, so it no longer counts as pending activity.
    #[must_use]
    pub fn has_pending_activity(&self) -> bool {
        self.is_pending() && self.transaction.strong_count() > 0
    }

    /// Delivers a successful result. Returns false if the request had
    /// already completed, in which case the result is dropped.
    pub fn complete_with_result(&self, result: RequestResult) -> bool {
        self.complete(Outcome::Success(result))
    }

    /// Delivers a failure. Returns false if the request had already
    /// completed, in which case the error is dropped.
    pub fn complete_with_error(&self, error: ClientError) -> bool {
        self.complete(Outcome::Failure(error))
    }

    fn complete(&self, outcome: Outcome) -> bool {
        let mut state = self.state.lock();
        match *state {
            RequestState::Pending | RequestState::WaitingForCursor => {
                *state = RequestState::Done(outcome);
                true
            }
            RequestState::Done(_) => {
                warn!(request = %self.resource_identifier, "duplicate completion ignored");
                false
            }
        }
    }

    /// Consumes a completed cursor payload and moves the request back to a
    /// waiting state so the next iteration step can rebind it.
    ///
    /// Returns `None` if the request is not a successfully completed
    /// cursor request holding a position.
    pub fn take_cursor_for_iteration(&self) -> Option<CursorHandle> {
        let mut state = self.state.lock();
        let handle = match &*state {
            RequestState::Done(Outcome::Success(RequestResult::Cursor(Some(handle)))) => {
                handle.clone()
            }
            _ => return None,
        };
        *state = RequestState::WaitingForCursor;
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::schema::DatabaseInfo;
    use crate::server::memory::MemoryServer;
    use crate::transaction::TransactionMode;

    fn request_under_test() -> (Arc<Transaction>, Arc<Request>) {
        let database = Database::new(
            DatabaseInfo::new("app", 1),
            Box::new(MemoryServer::new()),
            false,
        );
        let transaction = database
            .transaction(&[], TransactionMode::VersionChange)
            .unwrap();
        let request = Request::new(ResourceIdentifier::new(1), &transaction);
        (transaction, request)
    }

    #[test]
    fn completes_exactly_once() {
        let (_transaction, request) = request_under_test();
        assert!(request.is_pending());

        assert!(request.complete_with_result(RequestResult::Count(3)));
        assert!(!request.is_pending());
        assert_eq!(request.result(), Some(RequestResult::Count(3)));

        assert!(!request.complete_with_result(RequestResult::Count(9)));
        assert!(!request.complete_with_error(ClientError::unknown("late")));
        assert_eq!(request.result(), Some(RequestResult::Count(3)));
    }

    #[test]
    fn failure_is_exposed_through_error() {
        let (_transaction, request) = request_under_test();
        assert!(request.complete_with_error(ClientError::constraint("duplicate key")));
        assert!(request.result().is_none());
        assert_eq!(
            request.error(),
            Some(ClientError::constraint("duplicate key"))
        );
    }

    #[test]
    fn cursor_iteration_rebinds_the_same_request() {
        let (_transaction, request) = request_under_test();
        let handle = CursorHandle {
            cursor: CursorIdentifier::new(7),
            key: Key::Number(1.0),
            value: Value::Null,
        };
        assert!(request.complete_with_result(RequestResult::Cursor(Some(handle.clone()))));

        let taken = request.take_cursor_for_iteration().unwrap();
        assert_eq!(taken, handle);
        assert!(request.is_pending());

        let next = CursorHandle {
            cursor: CursorIdentifier::new(7),
            key: Key::Number(2.0),
            value: Value::Bool(true),
        };
        assert!(request.complete_with_result(RequestResult::Cursor(Some(next.clone()))));
        assert_eq!(request.result(), Some(RequestResult::Cursor(Some(next))));
    }

    #[test]
    fn take_cursor_requires_a_cursor_result() {
        let (_transaction, request) = request_under_test();
        assert!(request.take_cursor_for_iteration().is_none());

        request.complete_with_result(RequestResult::Count(1));
        assert!(request.take_cursor_for_iteration().is_none());
    }

    #[test]
    fn pending_activity_ends_with_the_transaction() {
        let (transaction, request) = request_under_test();
        assert!(request.has_pending_activity());
        drop(transaction);
        assert!(!request.has_pending_activity());
    }
}
