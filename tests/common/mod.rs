//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use hyperstate::{
    Action, Dispatch, Dispatchable, Options, Payload, Runtime, Subscriber, Unsubscribe,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Counter {
    pub count: i64,
}

pub fn counter(count: i64) -> Dispatchable<Counter> {
    Dispatchable::state(Counter { count })
}

/// Adds the payload (or 1) to the count.
pub fn add() -> Action<Counter> {
    Action::named("add", |state: &Arc<Counter>, by: Payload<Counter>| {
        Dispatchable::state(Counter {
            count: state.count + by.as_int().unwrap_or(1),
        })
    })
}

/// Returns the current state untouched.
pub fn keep() -> Action<Counter> {
    Action::named("keep", |state: &Arc<Counter>, _: Payload<Counter>| {
        Dispatchable::state(Arc::clone(state))
    })
}

/// Ordered log of observable events.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| e.as_str() == entry).count()
    }
}

/// Subscriber that journals `start:<label>:<payload>` and `stop:<label>`.
pub fn journaled_subscriber(journal: &Journal, label: &'static str) -> Subscriber<Counter> {
    let journal = journal.clone();
    Subscriber::named(label, move |_: &Dispatch<Counter>, payload: Payload<Counter>| {
        journal.push(format!("start:{label}:{payload:?}"));
        let journal = journal.clone();
        Ok(Unsubscribe::new(move || journal.push(format!("stop:{label}"))))
    })
}

/// Counts change notifications.
#[derive(Clone, Default)]
pub struct Renders(Arc<AtomicUsize>);

impl Renders {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn listener(&self) -> impl Fn(&Arc<Counter>) + Send + Sync + 'static {
        let counter = Arc::clone(&self.0);
        move |_: &Arc<Counter>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runtime over `Counter` starting at `count`, with a render counter.
pub fn runtime_at(count: i64, renders: &Renders) -> Runtime<Counter> {
    Runtime::new(Options::new(counter(count)).on_change(renders.listener()))
        .expect("runtime construction")
}

pub fn count_of(runtime: &Runtime<Counter>) -> i64 {
    runtime.state().map(|state| state.count).unwrap_or(i64::MIN)
}
