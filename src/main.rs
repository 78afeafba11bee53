use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hyperstate::config::Settings;
use hyperstate::fx::{self, Timer};
use hyperstate::logging::init_tracing;
use hyperstate::{traced, Action, Dispatchable, Options, Payload, Runtime};
use tokio::sync::watch;
use tracing::info;

/// Ticking counter running on the hyperstate runtime.
#[derive(Debug, Parser)]
#[command(name = "hyperstate-demo", version, about)]
struct Cli {
    /// Settings file (defaults to the per-user config path).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks before the timer subscription is dropped.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    ticks: u32,

    /// Tick interval in milliseconds.
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,
}

#[derive(Debug, Clone, Default)]
struct Counter {
    ticks: u32,
    target: u32,
    last_tick_ms: i64,
    done: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    init_tracing(&settings.logging);

    let interval = Duration::from_millis(cli.interval_ms.max(1));
    let (done_tx, mut done_rx) = watch::channel(false);

    let finish = Action::named("finish", |state: &Arc<Counter>, _: Payload<Counter>| {
        Dispatchable::state(Counter {
            done: true,
            ..Counter::clone(state)
        })
    });

    let tick = {
        let finish = finish.clone();
        Action::named("tick", move |state: &Arc<Counter>, now: Payload<Counter>| {
            let next = Counter {
                ticks: state.ticks + 1,
                last_tick_ms: now.as_int().unwrap_or_default(),
                ..Counter::clone(state)
            };
            let reached = next.ticks >= next.target;
            Dispatchable::with_effects(
                next,
                [fx::delay(interval, finish.clone().into()).when(reached)],
            )
        })
    };

    let timer = Timer::new();
    let init = Dispatchable::state(Counter {
        target: cli.ticks,
        ..Counter::default()
    });

    let runtime = Runtime::new(
        Options::new(init)
            .settings(settings.runtime.clone())
            .middleware(traced)
            .subscriptions(move |state: &Counter| {
                let running = !state.done && state.ticks < state.target;
                vec![timer.every(interval, tick.clone()).when(running)]
            })
            .on_change(move |state: &Arc<Counter>| {
                println!(
                    "ticks={}/{} last_tick_ms={} done={}",
                    state.ticks, state.target, state.last_tick_ms, state.done
                );
                if state.done {
                    let _ = done_tx.send(true);
                }
            }),
    )?;
    info!(runtime = %runtime.id(), "demo running");

    while !*done_rx.borrow_and_update() {
        done_rx.changed().await?;
    }

    info!(
        runtime = %runtime.id(),
        subscriptions = runtime.active_subscriptions(),
        "demo finished"
    );
    drop(runtime);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["hyperstate-demo"]);
        assert_eq!(cli.ticks, 5);
        assert_eq!(cli.interval_ms, 200);
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from(["hyperstate-demo", "--ticks", "2", "--interval-ms", "10"]);
        assert_eq!(cli.ticks, 2);
        assert_eq!(cli.interval_ms, 10);
    }

    #[test]
    fn cli_rejects_zero_ticks() {
        let err = Cli::try_parse_from(["hyperstate-demo", "--ticks", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["hyperstate-demo", "--interval-ms", "0"]).is_err());
    }
}
