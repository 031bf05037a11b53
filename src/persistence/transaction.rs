// persistence/transaction.rs - Transaction Context

//! Transactional scope collaborator. One guard wraps guard-chain evaluation,
//! handler execution and persistence for a single trigger; the remote
//! dispatch round-trip happens inside the scope, so real backends must
//! tolerate network-latency-length holds (or split the message-id commit
//! into an earlier sub-transaction).

use tracing::trace;

/// An open transactional scope. Dropping without commit is a rollback in
/// real backends; the engine always resolves explicitly.
pub trait Transaction: Send {
    fn commit(self: Box<Self>);

    fn rollback(self: Box<Self>);
}

/// Source of transactional scopes.
pub trait TransactionContext: Send + Sync {
    fn begin(&self) -> Box<dyn Transaction>;
}

/// No-op context for the in-memory store, whose writes apply immediately.
pub struct NoopTransactionContext;

impl TransactionContext for NoopTransactionContext {
    fn begin(&self) -> Box<dyn Transaction> {
        Box::new(NoopTransaction)
    }
}

struct NoopTransaction;

impl Transaction for NoopTransaction {
    fn commit(self: Box<Self>) {
        trace!("Transaction committed");
    }

    fn rollback(self: Box<Self>) {
        trace!("Transaction rolled back");
    }
}
