mod common;

use std::sync::Arc;

use common::{add, count_of, runtime_at, Counter, Journal, Renders};
use hyperstate::{Action, Dispatch, Dispatchable, DispatchError, Effect, Effecter, Payload};

fn recorder(journal: &Journal) -> Effecter<Counter> {
    let journal = journal.clone();
    Effecter::named("recorder", move |_: &Dispatch<Counter>, payload: Payload<Counter>| {
        journal.push(format!("{payload:?}"));
        Ok(())
    })
}

#[test]
fn empty_entries_run_nothing() {
    let journal = Journal::new();
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let fx = recorder(&journal);

    runtime
        .dispatch()
        .dispatch(Dispatchable::with_effects(
            Counter { count: 1 },
            [None, None, fx.with(1).when(false), None],
        ))
        .unwrap();

    assert!(journal.entries().is_empty());
    assert_eq!(count_of(&runtime), 1);
}

#[test]
fn effects_run_in_order_with_their_payloads() {
    let journal = Journal::new();
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let fx = recorder(&journal);

    runtime
        .dispatch()
        .dispatch(Dispatchable::with_effects(
            Counter { count: 1 },
            [
                Some(fx.with("first")),
                None,
                Some(Effect::from(fx.clone())),
                fx.with(3).when(true),
            ],
        ))
        .unwrap();

    assert_eq!(journal.entries(), vec!["\"first\"", "Unit", "3"]);
}

#[test]
fn effects_run_even_when_state_is_unchanged() {
    let journal = Journal::new();
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let fx = recorder(&journal);

    let ping = Action::named("ping", move |state: &Arc<Counter>, _: Payload<Counter>| {
        Dispatchable::with_effects(Arc::clone(state), [Some(fx.with("ping"))])
    });
    runtime.dispatch().dispatch(ping).unwrap();

    assert_eq!(journal.entries(), vec!["\"ping\""]);
    assert_eq!(renders.count(), 1);
}

#[test]
fn effect_can_dispatch_synchronously() {
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);

    let bump = Effect::named("bump", |dispatch: &Dispatch<Counter>, payload: Payload<Counter>| {
        dispatch.dispatch_with(add(), payload)?;
        Ok(())
    })
    .with_payload(5);

    runtime
        .dispatch()
        .dispatch(Dispatchable::with_effects(Counter { count: 1 }, [Some(bump)]))
        .unwrap();

    assert_eq!(count_of(&runtime), 6);
    assert_eq!(renders.count(), 3);
}

#[test]
fn failing_effect_stops_the_rest() {
    let journal = Journal::new();
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let fx = recorder(&journal);
    let broken = Effect::named("broken", |_: &Dispatch<Counter>, _: Payload<Counter>| {
        anyhow::bail!("printer on fire")
    });

    let err = runtime
        .dispatch()
        .dispatch(Dispatchable::with_effects(
            Counter { count: 1 },
            [Some(fx.with(1)), Some(broken), Some(fx.with(2))],
        ))
        .unwrap_err();

    match err {
        DispatchError::Effect {
            index, effecter, ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(effecter, "broken");
        }
        other => panic!("expected effect error, got {other:?}"),
    }
    assert_eq!(journal.entries(), vec!["1"]);
    // the transition itself already happened
    assert_eq!(count_of(&runtime), 1);
}

#[test]
fn effects_are_reusable_values() {
    let journal = Journal::new();
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let effect = recorder(&journal).with("again");

    for count in 1..=2 {
        runtime
            .dispatch()
            .dispatch(Dispatchable::with_effects(
                Counter { count },
                [Some(effect.clone())],
            ))
            .unwrap();
    }
    assert_eq!(journal.count("\"again\""), 2);
    assert_eq!(effect.name(), "recorder");
    assert_eq!(effect.payload().as_text(), Some("again"));
}
