//! hyperstate: a minimal reactive runtime.
//!
//! Pure state transitions, side effects and long-lived subscriptions behind
//! a single dispatch entry point. The view layer that renders state and
//! triggers re-renders is the host; it talks to the runtime through
//! [`binding`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use hyperstate::{Action, Dispatchable, Options, Runtime};
//!
//! #[derive(Debug, Default)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! let add = Action::new(|state: &Arc<Counter>, by: hyperstate::Payload<Counter>| {
//!     Dispatchable::state(Counter {
//!         count: state.count + by.as_int().unwrap_or(1),
//!     })
//! });
//!
//! let runtime = Runtime::new(Options::new(Dispatchable::state(Counter::default())))?;
//! runtime.handler(add).handle(5)?;
//! assert_eq!(runtime.state().map(|s| s.count), Some(5));
//! # Ok::<(), hyperstate::DispatchError>(())
//! ```

pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod fx;
pub mod logging;
pub mod runtime;

pub use crate::binding::{Handler, Instance, Listener};
pub use crate::engine::{
    compare, traced, Action, Dispatch, Dispatchable, Effect, Effecter, Middleware, Payload,
    PayloadComparison, Record, Subscriber, Subscription, Unsubscribe,
};
pub use crate::error::DispatchError;
pub use crate::runtime::{Options, Runtime};
