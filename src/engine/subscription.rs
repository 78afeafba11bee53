//! Subscriptions and their positional reconciliation.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::dispatch::Dispatch;
use super::payload::{self, Payload};
use crate::error::DispatchError;

type SubscriberFn<S> =
    dyn Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<Unsubscribe> + Send + Sync;

/// Starts a long-lived listener: `(dispatch, payload) -> Unsubscribe`.
///
/// Identity matters: a slot whose subscriber changes is restarted, so
/// build a subscriber once and clone it into every render.
pub struct Subscriber<S> {
    func: Arc<SubscriberFn<S>>,
    name: &'static str,
}

impl<S: 'static> Subscriber<S> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<Unsubscribe> + Send + Sync + 'static,
    {
        Self::named(std::any::type_name::<F>(), func)
    }

    pub fn named<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&Dispatch<S>, Payload<S>) -> anyhow::Result<Unsubscribe> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            name,
        }
    }
}

impl<S> Subscriber<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }

    /// Pair with a payload (`[subscriber, payload]`).
    pub fn with(&self, payload: impl Into<Payload<S>>) -> Subscription<S> {
        Subscription {
            subscriber: self.clone(),
            payload: payload.into(),
        }
    }
}

impl<S> Clone for Subscriber<S> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            name: self.name,
        }
    }
}

/// Cleanup returned by a subscriber. Runs at most once.
pub struct Unsubscribe(Box<dyn FnOnce() + Send>);

impl Unsubscribe {
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(cleanup))
    }

    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn call(self) {
        (self.0)()
    }
}

/// Aborts the task when the subscription stops.
impl<T: Send + 'static> From<tokio::task::JoinHandle<T>> for Unsubscribe {
    fn from(handle: tokio::task::JoinHandle<T>) -> Self {
        Self::new(move || handle.abort())
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// One candidate slot: a subscriber and its payload.
pub struct Subscription<S> {
    subscriber: Subscriber<S>,
    payload: Payload<S>,
}

impl<S> Subscription<S> {
    pub fn new(subscriber: Subscriber<S>, payload: impl Into<Payload<S>>) -> Self {
        Self {
            subscriber,
            payload: payload.into(),
        }
    }

    /// Conditional slot: `None` when `condition` is false.
    pub fn when(self, condition: bool) -> Option<Self> {
        condition.then_some(self)
    }

    pub fn subscriber(&self) -> &Subscriber<S> {
        &self.subscriber
    }

    pub fn payload(&self) -> &Payload<S> {
        &self.payload
    }

    /// The payload to restart with, or `None` to keep `running` as it is.
    fn restart_payload(&self, running: &Subscription<S>) -> Option<Payload<S>> {
        if !self.subscriber.ptr_eq(&running.subscriber) {
            return Some(self.payload.clone());
        }
        let comparison = payload::compare(&running.payload, &self.payload);
        comparison.differs.then_some(comparison.normalized)
    }

    fn start(self, dispatch: &Dispatch<S>) -> anyhow::Result<ActiveSubscription<S>> {
        let unsubscribe = (self.subscriber.func)(dispatch, self.payload.clone())?;
        Ok(ActiveSubscription {
            subscription: self,
            unsubscribe: Mutex::new(Some(unsubscribe)),
        })
    }
}

impl<S> Clone for Subscription<S> {
    fn clone(&self) -> Self {
        Self {
            subscriber: self.subscriber.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<S> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber.name)
            .field("payload", &self.payload)
            .finish()
    }
}

/// A started subscription and its cleanup handle.
pub(crate) struct ActiveSubscription<S> {
    subscription: Subscription<S>,
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl<S> ActiveSubscription<S> {
    /// Run the cleanup if it has not run yet.
    pub(crate) fn stop(&self) {
        let unsubscribe = self.unsubscribe.lock().take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe.call();
        }
    }
}

pub(crate) type Slot<S> = Option<Arc<ActiveSubscription<S>>>;

/// How a reconciliation pass ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Pass {
    Complete,
    /// A subscriber changed the state while starting. The slots already
    /// decided belong to the older state and need another pass.
    Superseded,
}

/// Diff the live `table` against `candidates` slot by slot.
///
/// Slot `i` of the candidates is only ever compared with slot `i` of the
/// table. A live slot is kept when its subscriber is the same function
/// and its payload does not differ; otherwise it is stopped before the new
/// subscriber starts. Reordering subscriptions therefore restarts them.
///
/// The table is read and written one slot at a time and never locked
/// while user code runs. A subscriber may dispatch while starting; the
/// nested pass runs to completion against the table as it is at that
/// point, and `superseded` reports it once the start returns. Cleanups may
/// dispatch too, so it is checked after each stop as well. Anything the
/// nested pass put into the slot being started is stopped when the new
/// entry replaces it.
///
/// On a start failure the slot is left empty, later slots keep their
/// entries and the error is returned.
pub(crate) fn reconcile<S>(
    table: &Mutex<Vec<Slot<S>>>,
    candidates: Vec<Option<Subscription<S>>>,
    dispatch: &Dispatch<S>,
    superseded: impl Fn() -> bool,
) -> Result<Pass, DispatchError> {
    let len = table.lock().len().max(candidates.len());
    let mut candidates = candidates.into_iter();

    for slot in 0..len {
        let running = table.lock().get(slot).cloned().flatten();
        let next = match (candidates.next().flatten(), running) {
            (None, None) => continue,
            (None, Some(running)) => {
                debug!(slot, subscriber = running.subscription.subscriber.name, "stopping subscription");
                retire(table, slot, &running);
                if superseded() {
                    debug!(slot, "state changed while stopping, pass superseded");
                    return Ok(Pass::Superseded);
                }
                continue;
            }
            (Some(next), Some(running)) => match next.restart_payload(&running.subscription) {
                None => continue,
                Some(payload) => {
                    debug!(slot, subscriber = running.subscription.subscriber.name, "restarting subscription");
                    retire(table, slot, &running);
                    Subscription::new(next.subscriber, payload)
                }
            },
            (Some(next), None) => next,
        };

        let subscriber = next.subscriber.name;
        debug!(slot, subscriber, "starting subscription");
        let active = next
            .start(dispatch)
            .map_err(|source| DispatchError::Subscribe {
                slot,
                subscriber,
                source,
            })?;
        install(table, slot, Arc::new(active));

        if superseded() {
            debug!(slot, "state changed while starting, pass superseded");
            return Ok(Pass::Superseded);
        }
    }

    Ok(Pass::Complete)
}

/// Stop `running` and empty its slot if it still holds it.
fn retire<S>(table: &Mutex<Vec<Slot<S>>>, slot: usize, running: &Arc<ActiveSubscription<S>>) {
    running.stop();
    let mut table = table.lock();
    if let Some(entry) = table.get_mut(slot) {
        if entry.as_ref().is_some_and(|held| Arc::ptr_eq(held, running)) {
            *entry = None;
        }
    }
}

/// Put `active` into `slot`, stopping whatever it displaces.
fn install<S>(table: &Mutex<Vec<Slot<S>>>, slot: usize, active: Arc<ActiveSubscription<S>>) {
    let displaced = {
        let mut table = table.lock();
        if table.len() <= slot {
            table.resize_with(slot + 1, || None);
        }
        table[slot].replace(active)
    };
    if let Some(displaced) = displaced {
        displaced.stop();
    }
}
