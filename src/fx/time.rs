use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context};
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::engine::{Action, Dispatch, Dispatchable, Effect, Payload, Subscriber, Subscription, Unsubscribe};
use crate::error::DispatchError;

/// Dispatch `dispatchable` after `after` has elapsed. It resolves against
/// the state current when the timer fires.
pub fn delay<S>(after: Duration, dispatchable: Dispatchable<S>) -> Effect<S>
where
    S: Send + Sync + 'static,
{
    Effect::named("fx::delay", move |dispatch: &Dispatch<S>, _: Payload<S>| {
        let handle = Handle::try_current().context("delayed effects need a tokio runtime")?;
        let dispatch = dispatch.clone();
        let dispatchable = dispatchable.clone();
        handle.spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(err) = dispatch.dispatch(dispatchable) {
                warn!(error_type = err.error_type(), error = %err, "delayed dispatch failed");
            }
        });
        Ok(())
    })
}

/// Interval subscriptions sharing one subscriber.
///
/// Keep a `Timer` for the lifetime of the subscriptions function and call
/// [`Timer::every`] on each render: the slot restarts only when the
/// interval changes, not when a fresh action is passed.
pub struct Timer<S> {
    subscriber: Subscriber<S>,
}

impl<S: Send + Sync + 'static> Timer<S> {
    pub fn new() -> Self {
        Self {
            subscriber: Subscriber::named("fx::every", start_interval::<S>),
        }
    }

    /// Dispatch `action` every `interval` with the current UNIX time in
    /// milliseconds as payload.
    pub fn every(&self, interval: Duration, action: Action<S>) -> Subscription<S> {
        let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        self.subscriber.with(Payload::record([
            ("interval_ms", Payload::Int(interval_ms)),
            ("action", Payload::Action(action)),
        ]))
    }
}

impl<S: Send + Sync + 'static> Default for Timer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Timer<S> {
    fn clone(&self) -> Self {
        Self {
            subscriber: self.subscriber.clone(),
        }
    }
}

fn start_interval<S>(dispatch: &Dispatch<S>, payload: Payload<S>) -> anyhow::Result<Unsubscribe>
where
    S: Send + Sync + 'static,
{
    let interval_ms = payload
        .get("interval_ms")
        .and_then(Payload::as_int)
        .ok_or_else(|| anyhow!("timer payload has no interval_ms"))?;
    let action = payload
        .get("action")
        .and_then(Payload::as_action)
        .cloned()
        .ok_or_else(|| anyhow!("timer payload has no action"))?;
    let period = u64::try_from(interval_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| anyhow!("timer interval must be positive, got {interval_ms}ms"))?;
    let handle = Handle::try_current().context("timer subscriptions need a tokio runtime")?;

    let dispatch = dispatch.clone();
    debug!(interval_ms, action = action.name(), "timer started");
    let task = handle.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match dispatch.dispatch_with(action.clone(), now_millis()) {
                Ok(()) => {}
                Err(DispatchError::Detached) => break,
                Err(err) => {
                    warn!(error_type = err.error_type(), error = %err, "timer dispatch failed");
                }
            }
        }
    });
    Ok(Unsubscribe::from(task))
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
