mod common;

use std::sync::Arc;

use common::{add, count_of, counter, keep, runtime_at, Counter, Journal, Renders};
use hyperstate::config::RuntimeSettings;
use hyperstate::{Action, Dispatch, Dispatchable, DispatchError, Effect, Options, Payload, Runtime};

#[test]
fn init_state_is_visible_and_notified() {
    let renders = Renders::default();
    let runtime = runtime_at(3, &renders);
    assert_eq!(count_of(&runtime), 3);
    assert_eq!(renders.count(), 1);
}

#[test]
fn bare_state_replaces_current() {
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    runtime.dispatch().dispatch(counter(9)).unwrap();
    assert_eq!(count_of(&runtime), 9);
    assert_eq!(renders.count(), 2);
}

#[test]
fn payload_beside_a_bare_state_is_ignored() {
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    runtime.dispatch().dispatch_with(counter(4), 100).unwrap();
    assert_eq!(count_of(&runtime), 4);
}

#[test]
fn action_without_payload_gets_unit() {
    let renders = Renders::default();
    let runtime = runtime_at(1, &renders);
    runtime.dispatch().dispatch(add()).unwrap();
    assert_eq!(count_of(&runtime), 2);
}

#[test]
fn bound_action_receives_its_own_payload() {
    let renders = Renders::default();
    let runtime = runtime_at(1, &renders);
    // the outer payload loses to the bound one
    runtime.dispatch().dispatch_with(add().with(10), 500).unwrap();
    assert_eq!(count_of(&runtime), 11);
}

#[test]
fn identity_gate_skips_notification() {
    let renders = Renders::default();
    let runtime = runtime_at(5, &renders);
    runtime.dispatch().dispatch(keep()).unwrap();
    let same = runtime.state().unwrap();
    runtime.dispatch().dispatch(Dispatchable::state(same)).unwrap();
    assert_eq!(renders.count(), 1);
}

#[test]
fn equal_but_distinct_state_is_a_change() {
    let renders = Renders::default();
    let runtime = runtime_at(5, &renders);
    runtime.dispatch().dispatch(counter(5)).unwrap();
    assert_eq!(renders.count(), 2);
}

#[test]
fn chained_actions_resolve_in_one_call() {
    let seen = Journal::new();
    let journal = seen.clone();

    let second = Action::named("second", |state: &Arc<Counter>, _: Payload<Counter>| {
        Dispatchable::state(Counter {
            count: state.count * 10,
        })
    });
    let first = Action::named("first", move |_: &Arc<Counter>, payload: Payload<Counter>| {
        assert_eq!(payload.as_int(), Some(7));
        Dispatchable::Action(second.clone())
    });

    let runtime = Runtime::new(Options::new(counter(2)).on_change(move |state: &Arc<Counter>| {
        journal.push(state.count.to_string());
    }))
    .unwrap();
    runtime.dispatch().dispatch(first.with(7)).unwrap();

    assert_eq!(count_of(&runtime), 20);
    assert_eq!(seen.entries(), vec!["2", "20"]);
}

#[test]
fn state_updates_before_effects_run() {
    let journal = Journal::new();
    let probe = {
        let journal = journal.clone();
        Effect::named("probe", move |_: &Dispatch<Counter>, _: Payload<Counter>| {
            journal.push("effect");
            Ok(())
        })
    };
    let runtime = {
        let journal = journal.clone();
        Runtime::new(Options::new(counter(0)).on_change(move |state: &Arc<Counter>| {
            journal.push(format!("render:{}", state.count));
        }))
        .unwrap()
    };

    runtime
        .dispatch()
        .dispatch(Dispatchable::with_effects(Counter { count: 1 }, [Some(probe)]))
        .unwrap();
    assert_eq!(journal.entries(), vec!["render:0", "render:1", "effect"]);
}

#[test]
fn action_before_any_state_is_unseeded() {
    let result = Runtime::new(Options::new(add()));
    match result {
        Err(DispatchError::Unseeded { action }) => assert_eq!(action, "add"),
        other => panic!("expected Unseeded, got {other:?}"),
    }
}

#[test]
fn seed_lets_init_be_an_action() {
    let renders = Renders::default();
    let runtime = Runtime::new(
        Options::new(add().with(4))
            .seed(Counter { count: 1 })
            .on_change(renders.listener()),
    )
    .unwrap();
    assert_eq!(count_of(&runtime), 5);
    assert_eq!(renders.count(), 1);
}

#[test]
fn seed_alone_is_silent() {
    let renders = Renders::default();
    let runtime = Runtime::new(
        Options::new(keep())
            .seed(Counter { count: 8 })
            .on_change(renders.listener()),
    )
    .unwrap();
    assert_eq!(count_of(&runtime), 8);
    assert_eq!(renders.count(), 0);
}

#[test]
fn middleware_sees_every_hop() {
    let hops = Journal::new();
    let log = hops.clone();
    let runtime = Runtime::new(Options::new(counter(0)).middleware(move |raw: Dispatch<Counter>| {
        Dispatch::new(move |dispatchable: Dispatchable<Counter>, payload: Payload<Counter>| {
            log.push(dispatchable.kind());
            raw.dispatch_with(dispatchable, payload)
        })
    }))
    .unwrap();
    hops.take();

    runtime.dispatch().dispatch(add().with(2)).unwrap();
    assert_eq!(hops.entries(), vec!["action+payload", "action", "state"]);
    assert_eq!(count_of(&runtime), 2);
}

#[test]
fn middleware_can_swallow_dispatches() {
    let runtime = Runtime::new(
        Options::new(counter(1)).middleware(|_raw: Dispatch<Counter>| {
            Dispatch::new(|_: Dispatchable<Counter>, _: Payload<Counter>| Ok(()))
        }),
    )
    .unwrap();
    assert!(runtime.state().is_none());
}

#[test]
fn dispatch_handle_is_stable() {
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let a = runtime.dispatch().clone();
    let b = runtime.handler(add());
    drop(b);
    assert!(a.ptr_eq(runtime.dispatch()));
}

#[test]
fn chain_depth_limit_fails_loudly() {
    let forever: Arc<std::sync::OnceLock<Action<Counter>>> = Arc::new(std::sync::OnceLock::new());
    let again = Arc::clone(&forever);
    let looping = Action::named("loop", move |_: &Arc<Counter>, _: Payload<Counter>| {
        Dispatchable::Action(again.get().cloned().expect("set below"))
    });
    let _ = forever.set(looping.clone());

    let runtime = Runtime::new(Options::new(counter(0)).settings(RuntimeSettings {
        max_chain_depth: Some(16),
        ..RuntimeSettings::default()
    }))
    .unwrap();

    let err = runtime.dispatch().dispatch(looping).unwrap_err();
    assert!(matches!(err, DispatchError::ChainTooDeep { limit: 16 }));

    // depth is unwound again: ordinary dispatches still work
    runtime.dispatch().dispatch(add()).unwrap();
    assert_eq!(count_of(&runtime), 1);
}

#[test]
fn dispatch_after_drop_is_detached() {
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let dispatch = runtime.dispatch().clone();
    drop(runtime);
    assert!(matches!(dispatch.dispatch(add()), Err(DispatchError::Detached)));
}

#[test]
#[should_panic(expected = "boom")]
fn panics_in_actions_propagate() {
    let renders = Renders::default();
    let runtime = runtime_at(0, &renders);
    let exploding = Action::named("explode", |_: &Arc<Counter>, _: Payload<Counter>| -> Dispatchable<Counter> {
        panic!("boom")
    });
    let _ = runtime.dispatch().dispatch(exploding);
}
