//! Dispatch primitives.
//!
//! # Architecture
//!
//! ```text
//! Dispatchable ──→ resolve ──→ (State, Effects)
//!      ↑                          │        │
//!      │                    identity gate  └──→ effects(dispatch, payload)
//!      │                          │
//!      │                  subscriptions(state) ──→ reconcile
//!      │                                              │
//!      └──────────── dispatch ←── effects / subscribers
//! ```
//!
//! - **Action**: pure function from state and payload to a dispatchable
//! - **Effect**: side effect scheduled by a transition
//! - **Subscription**: long-lived listener kept in a positional table
//! - **Dispatch**: the single handle every transition flows through

mod action;
mod dispatch;
mod effect;
mod payload;
mod subscription;

pub use action::{Action, Dispatchable};
pub use dispatch::{traced, Dispatch, Middleware};
pub use effect::{Effect, Effecter};
pub use payload::{compare, Payload, PayloadComparison, Record};
pub use subscription::{Subscriber, Subscription, Unsubscribe};

pub(crate) use effect::run_all;
pub(crate) use subscription::{reconcile, Pass, Slot};
