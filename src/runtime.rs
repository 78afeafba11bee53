//! The runtime: owns the state cell and the subscription table and wires
//! resolution, effects and reconciliation behind one dispatch handle.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::binding::{Handler, Listener};
use crate::config::RuntimeSettings;
use crate::engine::{
    reconcile, run_all, Dispatch, Dispatchable, Middleware, Pass, Payload, Slot, Subscription,
};
use crate::error::DispatchError;

type SubscriptionsFn<S> = dyn Fn(&S) -> Vec<Option<Subscription<S>>> + Send + Sync;

/// Construction input for a [`Runtime`].
pub struct Options<S> {
    init: Dispatchable<S>,
    seed: Option<Arc<S>>,
    subscriptions: Option<Box<SubscriptionsFn<S>>>,
    middleware: Option<Middleware<S>>,
    listener: Option<Box<dyn Listener<S>>>,
    settings: RuntimeSettings,
}

impl<S: Send + Sync + 'static> Options<S> {
    /// `init` is dispatched once, during construction.
    pub fn new(init: impl Into<Dispatchable<S>>) -> Self {
        Self {
            init: init.into(),
            seed: None,
            subscriptions: None,
            middleware: None,
            listener: None,
            settings: RuntimeSettings::default(),
        }
    }

    /// Starting state for an `init` that is an action. Installed without
    /// notifying or reconciling.
    pub fn seed(mut self, state: impl Into<Arc<S>>) -> Self {
        self.seed = Some(state.into());
        self
    }

    /// Produces the subscription candidates for a state; re-run after
    /// every accepted change.
    pub fn subscriptions<F>(mut self, subscriptions: F) -> Self
    where
        F: Fn(&S) -> Vec<Option<Subscription<S>>> + Send + Sync + 'static,
    {
        self.subscriptions = Some(Box::new(subscriptions));
        self
    }

    /// Wrap the raw dispatch once at construction.
    pub fn middleware<F>(mut self, middleware: F) -> Self
    where
        F: FnOnce(Dispatch<S>) -> Dispatch<S> + Send + 'static,
    {
        self.middleware = Some(Box::new(middleware));
        self
    }

    /// Notified on every accepted state change.
    pub fn on_change(mut self, listener: impl Listener<S> + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }
}

struct Core<S> {
    id: Uuid,
    label: String,
    max_depth: Option<usize>,
    state: Mutex<Option<Arc<S>>>,
    table: Mutex<Vec<Slot<S>>>,
    subscriptions: Option<Box<SubscriptionsFn<S>>>,
    listener: Option<Box<dyn Listener<S>>>,
    /// The wrapped dispatch, used for every recursive step.
    dispatch: OnceLock<Dispatch<S>>,
    /// Serializes whole dispatches; same-thread reentry nests.
    gate: ReentrantMutex<()>,
    depth: AtomicUsize,
    /// Bumped on every accepted change.
    generation: AtomicU64,
}

impl<S: Send + Sync + 'static> Core<S> {
    fn dispatch(&self) -> Result<Dispatch<S>, DispatchError> {
        self.dispatch.get().cloned().ok_or(DispatchError::Detached)
    }

    fn current(&self) -> Option<Arc<S>> {
        self.state.lock().clone()
    }

    fn resolve(&self, dispatchable: Dispatchable<S>, payload: Payload<S>) -> Result<(), DispatchError> {
        let _serial = self.gate.lock();
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        scopeguard::defer! {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(limit) = self.max_depth {
            if depth > limit {
                return Err(DispatchError::ChainTooDeep { limit });
            }
        }
        trace!(runtime = %self.id, depth, kind = dispatchable.kind(), "resolving");

        match dispatchable {
            Dispatchable::Action(action) => {
                let state = self.current().ok_or(DispatchError::Unseeded {
                    action: action.name(),
                })?;
                let next = action.call(&state, payload);
                self.dispatch()?.dispatch(next)
            }
            Dispatchable::Bound(action, payload) => self
                .dispatch()?
                .dispatch_with(Dispatchable::Action(action), payload),
            Dispatchable::Transition(state, effects) => {
                self.update(state)?;
                run_all(effects, &self.dispatch()?)
            }
            Dispatchable::State(state) => self.update(state),
        }
    }

    /// Identity gate: only a different `Arc` counts as a change.
    fn update(&self, next: Arc<S>) -> Result<(), DispatchError> {
        let mut generation = {
            let mut current = self.state.lock();
            if current.as_ref().is_some_and(|state| Arc::ptr_eq(state, &next)) {
                trace!(runtime = %self.id, "state unchanged");
                return Ok(());
            }
            *current = Some(Arc::clone(&next));
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        debug!(runtime = %self.id, label = %self.label, "state changed");

        if let Some(listener) = &self.listener {
            listener.state_changed(&next);
        }

        let Some(subscriptions) = &self.subscriptions else {
            return Ok(());
        };
        let dispatch = self.dispatch()?;
        let mut state = next;
        loop {
            // The listener, a starting subscriber or a cleanup may have
            // dispatched. Reconcile against the newest state only.
            let latest = self.generation.load(Ordering::SeqCst);
            if latest != generation {
                let Some(newest) = self.current() else {
                    return Ok(());
                };
                debug!(runtime = %self.id, "reconciling again after a nested change");
                state = newest;
                generation = latest;
            }
            let candidates = subscriptions(state.as_ref());
            let pass = reconcile(&self.table, candidates, &dispatch, || {
                self.generation.load(Ordering::SeqCst) != generation
            })?;
            if pass == Pass::Complete {
                return Ok(());
            }
        }
    }

    fn stop_all(&self) {
        let table = std::mem::take(&mut *self.table.lock());
        let mut stopped = 0usize;
        for active in table.into_iter().flatten() {
            active.stop();
            stopped += 1;
        }
        info!(runtime = %self.id, label = %self.label, stopped, "runtime stopped");
    }
}

/// A runtime instance.
///
/// Dropping it stops every live subscription. Dispatch handles that
/// outlive it return [`DispatchError::Detached`].
pub struct Runtime<S: Send + Sync + 'static> {
    core: Arc<Core<S>>,
    dispatch: Dispatch<S>,
}

impl<S: Send + Sync + 'static> Runtime<S> {
    /// Build the dispatch function, apply the middleware, then dispatch
    /// `init`. An error from `init` drops the runtime again.
    pub fn new(options: Options<S>) -> Result<Self, DispatchError> {
        let Options {
            init,
            seed,
            subscriptions,
            middleware,
            listener,
            settings,
        } = options;

        let core = Arc::new(Core {
            id: Uuid::new_v4(),
            label: settings.label,
            max_depth: settings.max_chain_depth,
            state: Mutex::new(seed),
            table: Mutex::new(Vec::new()),
            subscriptions,
            listener,
            dispatch: OnceLock::new(),
            gate: ReentrantMutex::new(()),
            depth: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        });

        let weak: Weak<Core<S>> = Arc::downgrade(&core);
        let raw = Dispatch::new(move |dispatchable: Dispatchable<S>, payload: Payload<S>| {
            match weak.upgrade() {
                Some(core) => core.resolve(dispatchable, payload),
                None => Err(DispatchError::Detached),
            }
        });
        let dispatch = match middleware {
            Some(wrap) => wrap(raw),
            None => raw,
        };
        let dispatch = core.dispatch.get_or_init(|| dispatch).clone();
        info!(runtime = %core.id, label = %core.label, "runtime constructed");

        let runtime = Self { core, dispatch };
        runtime.dispatch.dispatch(init)?;
        Ok(runtime)
    }

    /// Current state; `None` only if nothing has been set yet.
    pub fn state(&self) -> Option<Arc<S>> {
        self.core.current()
    }

    pub fn dispatch(&self) -> &Dispatch<S> {
        &self.dispatch
    }

    /// Event handler factory: dispatches `action` with each event.
    pub fn handler(&self, action: impl Into<Dispatchable<S>>) -> Handler<S> {
        Handler::new(self.dispatch.clone(), action.into())
    }

    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn label(&self) -> &str {
        &self.core.label
    }

    /// Number of live subscription slots.
    pub fn active_subscriptions(&self) -> usize {
        self.core.table.lock().iter().flatten().count()
    }
}

impl<S: Send + Sync + 'static> Drop for Runtime<S> {
    fn drop(&mut self) {
        self.core.stop_all();
    }
}

impl<S: Send + Sync + 'static> fmt::Debug for Runtime<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.core.id)
            .field("label", &self.core.label)
            .finish_non_exhaustive()
    }
}
