//! Ready-made effects and subscriptions backed by tokio.
//!
//! Each of these spawns onto the tokio runtime current at the time the
//! effect runs or the subscription starts, and fails without one.

mod task;
mod time;

pub use task::task;
pub use time::{delay, Timer};
