use std::future::Future;

use anyhow::Context;
use tokio::runtime::Handle;
use tracing::error;

use crate::engine::{Dispatch, Effecter, Payload};

/// Effecter for async work. The future is spawned and not awaited; a
/// failure is logged and never reaches the dispatch that scheduled it.
pub fn task<S, F, Fut>(func: F) -> Effecter<S>
where
    S: 'static,
    F: Fn(Dispatch<S>, Payload<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let name = std::any::type_name::<F>();
    Effecter::named(name, move |dispatch: &Dispatch<S>, payload: Payload<S>| {
        let handle = Handle::try_current().context("task effects need a tokio runtime")?;
        let work = func(dispatch.clone(), payload);
        handle.spawn(async move {
            if let Err(err) = work.await {
                let message = format!("{err:#}");
                error!(effect = name, error = %message, "deferred effect failed");
            }
        });
        Ok(())
    })
}
