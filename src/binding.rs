//! Surface for the view layer hosting a runtime.
//!
//! The host supplies a change sink ([`Listener`]) and keeps one runtime
//! per component across repeated setup calls ([`Instance`]). In return it
//! reads the state snapshot and turns actions into event handlers
//! ([`Handler`]).

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::engine::{Dispatch, Dispatchable, Payload};
use crate::error::DispatchError;
use crate::runtime::{Options, Runtime};

/// Notification sink, called after every accepted state change (the
/// host's re-render trigger).
pub trait Listener<S>: Send + Sync {
    fn state_changed(&self, state: &Arc<S>);
}

impl<S, F> Listener<S> for F
where
    F: Fn(&Arc<S>) + Send + Sync,
{
    fn state_changed(&self, state: &Arc<S>) {
        self(state)
    }
}

/// Construct-once cell for a runtime.
///
/// The first successful [`Instance::setup`] builds the runtime; later
/// calls return it without evaluating their options.
pub struct Instance<S: Send + Sync + 'static> {
    runtime: OnceLock<Runtime<S>>,
    // held while building so a racing first call waits instead of building twice
    build: Mutex<()>,
}

impl<S: Send + Sync + 'static> Instance<S> {
    pub const fn new() -> Self {
        Self {
            runtime: OnceLock::new(),
            build: parking_lot::const_mutex(()),
        }
    }

    /// Returns the runtime, building it from `options` on first use.
    ///
    /// Only one runtime is ever built: a thread racing through the first
    /// call waits for the build in progress and returns its result. After
    /// a failed build the next caller tries again with its own options.
    pub fn setup<F>(&self, options: F) -> Result<&Runtime<S>, DispatchError>
    where
        F: FnOnce() -> Options<S>,
    {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let _building = self.build.lock();
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = Runtime::new(options())?;
        Ok(self.runtime.get_or_init(|| runtime))
    }

    pub fn get(&self) -> Option<&Runtime<S>> {
        self.runtime.get()
    }
}

impl<S: Send + Sync + 'static> Default for Instance<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches one action with whatever event it is given.
pub struct Handler<S> {
    dispatch: Dispatch<S>,
    action: Dispatchable<S>,
}

impl<S> Handler<S> {
    pub(crate) fn new(dispatch: Dispatch<S>, action: Dispatchable<S>) -> Self {
        Self { dispatch, action }
    }

    /// Dispatch the action with `event` as its payload.
    pub fn handle(&self, event: impl Into<Payload<S>>) -> Result<(), DispatchError> {
        self.dispatch.dispatch_with(self.action.clone(), event)
    }

    /// Capture `event` now, dispatch later.
    pub fn bind(&self, event: impl Into<Payload<S>>) -> impl Fn() -> Result<(), DispatchError> {
        let dispatch = self.dispatch.clone();
        let action = self.action.clone();
        let event = event.into();
        move || dispatch.dispatch_with(action.clone(), event.clone())
    }
}

impl<S> Clone for Handler<S> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            action: self.action.clone(),
        }
    }
}
