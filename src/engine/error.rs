// engine/error.rs - Engine Error Taxonomy

use crate::dispatch::DispatchError;
use crate::persistence::StoreError;

/// Hard failures surfaced by `handle`.
///
/// Skips (stale trigger, terminal entity, no handler, pending guard) are not
/// errors; the caller cannot distinguish "processed" from "skipped" so that
/// re-triggering is always safe.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity_kind} '{id}' not found")]
    NotFound { entity_kind: &'static str, id: String },

    #[error("handler for {state} requires role {required} but {entity_kind} '{id}' is {actual}")]
    RoleMismatch {
        entity_kind: &'static str,
        id: String,
        state: &'static str,
        required: crate::engine::Role,
        actual: crate::engine::Role,
    },

    /// A prerequisite (webhook, policy, asset address, vault secret) is
    /// missing; the entity has already been parked in a terminal state with
    /// the same detail.
    #[error("'{id}': {detail}")]
    PrerequisiteMissing { id: String, detail: String },

    /// The remote call failed; the entity state is unchanged and the next
    /// trigger retries the same step with the same message id.
    #[error("dispatch of {message} for '{id}' failed: {source}")]
    Dispatch {
        id: String,
        message: &'static str,
        #[source]
        source: DispatchError,
    },

    /// The data-flow collaborator refused; the entity has been terminated
    /// with the collaborator's detail.
    #[error("data flow failure for '{id}': {detail}")]
    DataFlow { id: String, detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the surrounding transaction must roll back.
    ///
    /// Business failures commit: the handler has deliberately parked the
    /// entity in a safe terminal state (or, for dispatch, touched nothing but
    /// the retry-stable message id) and rolling that back would retrigger the
    /// same dead end forever. Only infrastructure faults roll back.
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, EngineError::Store(_) | EngineError::Internal(_))
    }
}
