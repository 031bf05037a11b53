// persistence/mod.rs - Persistence Contracts

//! Store and transaction collaborators.
//!
//! The engine only depends on the traits here; the in-memory implementations
//! back tests and the demo binary. Durable backends (SQL, document stores)
//! are out of scope for this crate and plug in through the same contracts.

mod store;
mod transaction;

pub use store::{EntityStore, InMemoryStore, StoreError};
pub use transaction::{NoopTransactionContext, Transaction, TransactionContext};
