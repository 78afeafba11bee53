//! The dispatch handle and the middleware seam around it.

use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use super::action::Dispatchable;
use super::payload::Payload;
use crate::error::DispatchError;

type DispatchFn<S> =
    dyn Fn(Dispatchable<S>, Payload<S>) -> Result<(), DispatchError> + Send + Sync;

/// Handle to a runtime's dispatch function.
///
/// Cheap to clone; every clone calls the same function. Effects and
/// subscribers receive it explicitly and may keep it for later calls.
pub struct Dispatch<S> {
    func: Arc<DispatchFn<S>>,
}

impl<S: 'static> Dispatch<S> {
    /// Build a dispatch function. Used by the runtime and by middleware.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Dispatchable<S>, Payload<S>) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }
}

impl<S> Dispatch<S> {
    pub fn dispatch(&self, dispatchable: impl Into<Dispatchable<S>>) -> Result<(), DispatchError> {
        (self.func)(dispatchable.into(), Payload::Unit)
    }

    /// Dispatch with a payload. The payload only matters when the
    /// dispatchable is an action.
    pub fn dispatch_with(
        &self,
        dispatchable: impl Into<Dispatchable<S>>,
        payload: impl Into<Payload<S>>,
    ) -> Result<(), DispatchError> {
        (self.func)(dispatchable.into(), payload.into())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl<S> Clone for Dispatch<S> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<S> fmt::Debug for Dispatch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch")
    }
}

/// Wraps the raw dispatch once at construction: `raw -> dispatch`.
///
/// The wrapped function is what effects, subscribers and every resolution
/// step call, so a middleware sees each hop of an action chain.
pub type Middleware<S> = Box<dyn FnOnce(Dispatch<S>) -> Dispatch<S> + Send>;

/// Middleware that logs every dispatch hop at trace level and failures
/// at warn level.
pub fn traced<S: 'static>(next: Dispatch<S>) -> Dispatch<S> {
    Dispatch::new(move |dispatchable: Dispatchable<S>, payload: Payload<S>| {
        let kind = dispatchable.kind();
        trace!(kind, ?payload, "dispatch");
        let result = next.dispatch_with(dispatchable, payload);
        if let Err(err) = &result {
            warn!(kind, error_type = err.error_type(), error = %err, "dispatch failed");
        }
        result
    })
}
