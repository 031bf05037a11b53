// engine/handler.rs - Handler Registry

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::entity::{ProtocolEntity, Role, StateCode};
use super::error::EngineError;

/// Role a handler demands of the entity it acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleBinding {
    /// Either side may act in this state.
    Any,
    /// Only the given role may act.
    Only(Role),
}

impl RoleBinding {
    /// The required role violated by `actual`, if any.
    pub fn violated_by(&self, actual: Role) -> Option<Role> {
        match self {
            RoleBinding::Any => None,
            RoleBinding::Only(required) if *required == actual => None,
            RoleBinding::Only(required) => Some(*required),
        }
    }
}

/// Transition function for one state, bound to the orchestrator's service
/// context `C`. Plain fn pointers keep the table `'static` data.
pub type HandlerFn<C, E> = fn(Arc<C>, E) -> BoxFuture<'static, Result<(), EngineError>>;

pub struct HandlerEntry<C, E: ProtocolEntity> {
    pub role: RoleBinding,
    pub run: HandlerFn<C, E>,
}

/// State -> (transition function, required role), built once at construction
/// and looked up by state value on every trigger.
pub struct HandlerTable<C, E: ProtocolEntity> {
    entries: HashMap<E::State, HandlerEntry<C, E>>,
}

impl<C, E: ProtocolEntity> HandlerTable<C, E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register the handler for `state`.
    pub fn bind(mut self, state: E::State, role: RoleBinding, run: HandlerFn<C, E>) -> Self {
        debug_assert!(
            !state.is_terminal(),
            "terminal state {} must not carry a handler",
            state.name()
        );
        self.entries.insert(state, HandlerEntry { role, run });
        self
    }

    pub fn get(&self, state: &E::State) -> Option<&HandlerEntry<C, E>> {
        self.entries.get(state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C, E: ProtocolEntity> Default for HandlerTable<C, E> {
    fn default() -> Self {
        Self::new()
    }
}
