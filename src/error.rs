//! Errors surfaced by dispatch.
//!
//! The runtime has no recovery layer. Failures from effecters and
//! subscribers come back to whoever called dispatch, and panics inside
//! actions, effecters or subscribers unwind straight through it. Deferred
//! work that fails after dispatch has returned is logged where it runs.

use thiserror::Error;

/// Errors returned from a dispatch call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An action ran before any state existed (no seed, no state yet).
    #[error("action '{action}' was dispatched before any state was set")]
    Unseeded { action: &'static str },

    /// An effecter returned an error; later effects of the same
    /// transition did not run.
    #[error("effect #{index} ({effecter}) failed: {source}")]
    Effect {
        index: usize,
        effecter: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A subscriber failed to start.
    #[error("subscription slot {slot} ({subscriber}) failed to start: {source}")]
    Subscribe {
        slot: usize,
        subscriber: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Nested dispatches went deeper than the configured limit.
    #[error("dispatch nested deeper than {limit} levels")]
    ChainTooDeep { limit: usize },

    /// The runtime behind this handle has been dropped.
    #[error("runtime has been dropped")]
    Detached,
}

impl DispatchError {
    /// Short machine-readable tag, used in log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            DispatchError::Unseeded { .. } => "unseeded",
            DispatchError::Effect { .. } => "effect_failed",
            DispatchError::Subscribe { .. } => "subscribe_failed",
            DispatchError::ChainTooDeep { .. } => "chain_too_deep",
            DispatchError::Detached => "detached",
        }
    }
}
