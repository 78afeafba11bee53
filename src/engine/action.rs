//! Actions and the dispatchable shapes they produce.

use std::fmt;
use std::sync::Arc;

use super::effect::Effect;
use super::payload::Payload;

type ActionFn<S> = dyn Fn(&Arc<S>, Payload<S>) -> Dispatchable<S> + Send + Sync;

/// A pure transition: `(state, payload) -> Dispatchable`.
///
/// Actions never perform side effects themselves; they describe them as
/// effects in a [`Dispatchable::Transition`]. Two actions are the same when
/// they share the same function allocation, so clone an action instead of
/// rebuilding it when identity matters.
pub struct Action<S> {
    func: Arc<ActionFn<S>>,
    name: &'static str,
}

impl<S: 'static> Action<S> {
    /// Wrap a closure, naming it after its type for diagnostics.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Arc<S>, Payload<S>) -> Dispatchable<S> + Send + Sync + 'static,
    {
        Self::named(std::any::type_name::<F>(), func)
    }

    pub fn named<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&Arc<S>, Payload<S>) -> Dispatchable<S> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            name,
        }
    }
}

impl<S> Action<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Function identity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }

    /// Pair this action with a payload (`[action, payload]`).
    pub fn with(&self, payload: impl Into<Payload<S>>) -> Dispatchable<S> {
        Dispatchable::Bound(self.clone(), payload.into())
    }

    pub(crate) fn call(&self, state: &Arc<S>, payload: Payload<S>) -> Dispatchable<S> {
        (self.func)(state, payload)
    }
}

impl<S> Clone for Action<S> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            name: self.name,
        }
    }
}

impl<S> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// Anything that can be handed to dispatch.
///
/// Variants are listed in the order the resolver checks them: callables
/// win over sequences, and a sequence headed by an action is a bound
/// action rather than a state with effects.
pub enum Dispatchable<S> {
    /// Run the action against the current state with no payload.
    Action(Action<S>),
    /// Run the action against the current state with this payload.
    Bound(Action<S>, Payload<S>),
    /// Replace the state, then run the effects. `None` entries are skipped.
    Transition(Arc<S>, Vec<Option<Effect<S>>>),
    /// Replace the state.
    State(Arc<S>),
}

impl<S> Dispatchable<S> {
    /// A bare state. Pass back the `Arc` an action received to keep the
    /// current state.
    pub fn state(state: impl Into<Arc<S>>) -> Self {
        Dispatchable::State(state.into())
    }

    /// A state followed by effect entries.
    pub fn with_effects<I>(state: impl Into<Arc<S>>, effects: I) -> Self
    where
        I: IntoIterator<Item = Option<Effect<S>>>,
    {
        Dispatchable::Transition(state.into(), effects.into_iter().collect())
    }

    /// Shape name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Dispatchable::Action(_) => "action",
            Dispatchable::Bound(..) => "action+payload",
            Dispatchable::Transition(..) => "state+effects",
            Dispatchable::State(_) => "state",
        }
    }
}

impl<S> Clone for Dispatchable<S> {
    fn clone(&self) -> Self {
        match self {
            Dispatchable::Action(action) => Dispatchable::Action(action.clone()),
            Dispatchable::Bound(action, payload) => {
                Dispatchable::Bound(action.clone(), payload.clone())
            }
            Dispatchable::Transition(state, effects) => {
                Dispatchable::Transition(Arc::clone(state), effects.clone())
            }
            Dispatchable::State(state) => Dispatchable::State(Arc::clone(state)),
        }
    }
}

impl<S> fmt::Debug for Dispatchable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatchable::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Dispatchable::Bound(action, payload) => {
                f.debug_tuple("Bound").field(action).field(payload).finish()
            }
            Dispatchable::Transition(_, effects) => f
                .debug_struct("Transition")
                .field("effects", &effects.len())
                .finish_non_exhaustive(),
            Dispatchable::State(_) => f.write_str("State(..)"),
        }
    }
}

impl<S> From<Action<S>> for Dispatchable<S> {
    fn from(action: Action<S>) -> Self {
        Dispatchable::Action(action)
    }
}

impl<S> From<Arc<S>> for Dispatchable<S> {
    fn from(state: Arc<S>) -> Self {
        Dispatchable::State(state)
    }
}
