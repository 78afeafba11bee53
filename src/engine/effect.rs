//! Effects: side-effecting work scheduled by a transition.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::dispatch::Dispatch;
use super::payload::Payload;
use crate::error::DispatchError;

type EffecterFn<S> = dyn Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<()> + Send + Sync;

/// The function that runs an effect: `(dispatch, payload)`.
///
/// An effecter affects state only by calling `dispatch`, either right away
/// or later from work it spawned. Returning an error aborts the remaining
/// effects of the transition and surfaces from the dispatch call.
pub struct Effecter<S> {
    func: Arc<EffecterFn<S>>,
    name: &'static str,
}

impl<S: 'static> Effecter<S> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::named(std::any::type_name::<F>(), func)
    }

    pub fn named<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            name,
        }
    }
}

impl<S> Effecter<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Pair with a payload (`[effecter, payload]`).
    pub fn with(&self, payload: impl Into<Payload<S>>) -> Effect<S> {
        Effect {
            effecter: self.clone(),
            payload: payload.into(),
        }
    }
}

impl<S> Clone for Effecter<S> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            name: self.name,
        }
    }
}

/// An effecter together with its payload.
pub struct Effect<S> {
    effecter: Effecter<S>,
    payload: Payload<S>,
}

impl<S: 'static> Effect<S> {
    /// A bare effecter; its payload is [`Payload::Unit`].
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Effecter::new(func).into()
    }

    pub fn named<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Effecter::named(name, func).into()
    }
}

impl<S> Effect<S> {
    pub fn with_payload(mut self, payload: impl Into<Payload<S>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Conditional entry: `None` when `condition` is false.
    pub fn when(self, condition: bool) -> Option<Self> {
        condition.then_some(self)
    }

    pub fn name(&self) -> &'static str {
        self.effecter.name
    }

    pub fn payload(&self) -> &Payload<S> {
        &self.payload
    }

    fn run(self, dispatch: &Dispatch<S>) -> anyhow::Result<()> {
        (self.effecter.func)(dispatch, self.payload)
    }
}

impl<S> From<Effecter<S>> for Effect<S> {
    fn from(effecter: Effecter<S>) -> Self {
        Effect {
            effecter,
            payload: Payload::Unit,
        }
    }
}

impl<S> Clone for Effect<S> {
    fn clone(&self) -> Self {
        Self {
            effecter: self.effecter.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<S> fmt::Debug for Effect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("effecter", &self.effecter.name)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Run effect entries in order. Empty entries are skipped; the first
/// failure stops the rest.
///
/// Effects are not awaited: anything an effecter spawns finishes on its
/// own schedule and reaches the runtime only through `dispatch`.
pub(crate) fn run_all<S>(
    effects: Vec<Option<Effect<S>>>,
    dispatch: &Dispatch<S>,
) -> Result<(), DispatchError> {
    for (index, entry) in effects.into_iter().enumerate() {
        let Some(effect) = entry else {
            trace!(index, "skipping empty effect entry");
            continue;
        };
        let effecter = effect.name();
        trace!(index, effecter, "running effect");
        effect
            .run(dispatch)
            .map_err(|source| DispatchError::Effect {
                index,
                effecter,
                source,
            })?;
    }
    Ok(())
}
