use std::sync::{Arc, Mutex};

use crate::battle::commands::{execute_command, BattleCommand};
use crate::battle::engine::{resolve_turn, submit_choice};
use crate::battle::state::{BattleEvent, BattleState, GameState};
use crate::choices::{Choice, MoveChoice, NormalTarget, SlotChoice};
use crate::battle::tests::common::{create_doubles_battle, create_test_battle, TestPokemonBuilder};
use crate::effects::{EffectKind, EffectSource};
use crate::errors::DispatchError;
use crate::events::{
    handler_order, priority_event, run_event, Callback, EventKind, HandlerDescriptor, HandlerTable, Holder,
    Outcome, RelayValue, Scope,
};
use crate::pokemon::PokemonRef;
use pretty_assertions::assert_eq;
use schema::SideId;

type Calls = Arc<Mutex<Vec<&'static str>>>;

fn record(calls: &Calls, name: &'static str) -> Callback {
    let calls = Arc::clone(calls);
    Callback::action(move |_, _| {
        calls.lock().unwrap().push(name);
        Ok(())
    })
}

fn attach(battle: &mut BattleState, holder: Holder, id: &str, kind: EffectKind, table: HandlerTable) -> u64 {
    let source = EffectSource::new(id.into(), kind, Arc::new(table));
    battle.attach(holder, source).0
}

fn table(descriptor: crate::events::DescriptorBuilder) -> HandlerTable {
    HandlerTable::new().with(descriptor).unwrap()
}

fn pikachu() -> PokemonRef {
    PokemonRef::new(SideId::P1, 0)
}

fn eevee() -> PokemonRef {
    PokemonRef::new(SideId::P2, 0)
}

fn speedy_battle() -> BattleState {
    create_test_battle(
        vec![TestPokemonBuilder::new("Pikachu").with_speed(100).build()],
        vec![TestPokemonBuilder::new("Eevee").with_speed(80).build()],
    )
}

#[test]
fn test_faster_holder_runs_first_regardless_of_registration() {
    let mut battle = speedy_battle();
    let calls = Calls::default();

    // Registered slower-first on purpose.
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "slowwatch",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::SwitchIn, record(&calls, "eevee")).scope(Scope::Any)),
    );
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "fastwatch",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::SwitchIn, record(&calls, "pikachu")).scope(Scope::Any)),
    );

    run_event(&mut battle, EventKind::SwitchIn, pikachu(), None, None, RelayValue::Absent).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["pikachu", "eevee"]);
}

#[test]
fn test_order_then_priority_then_speed() {
    let mut battle = speedy_battle();
    let calls = Calls::default();

    attach(
        &mut battle,
        Holder::Field,
        "fieldwatch",
        EffectKind::PseudoWeather,
        table(HandlerDescriptor::on(EventKind::SwitchIn, record(&calls, "field")).scope(Scope::Any)),
    );
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "eager",
        EffectKind::Ability,
        table(
            HandlerDescriptor::on(EventKind::SwitchIn, record(&calls, "priority"))
                .scope(Scope::Any)
                .priority(5),
        ),
    );
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "first",
        EffectKind::Item,
        table(
            HandlerDescriptor::on(EventKind::SwitchIn, record(&calls, "ordered"))
                .scope(Scope::Any)
                .order(1),
        ),
    );
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "plain",
        EffectKind::Item,
        table(HandlerDescriptor::on(EventKind::SwitchIn, record(&calls, "speed")).scope(Scope::Any)),
    );

    run_event(&mut battle, EventKind::SwitchIn, eevee(), None, None, RelayValue::Absent).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["ordered", "priority", "speed", "field"]);
}

#[test]
fn test_sub_order_then_registration_order() {
    let mut battle = speedy_battle();
    let calls = Calls::default();

    // BasePower ignores speed, so the ability (sub-order 7) waits behind the
    // side condition (4) and the two pseudo-weathers (5) keep registration
    // order.
    let step = |calls: &Calls, name: &'static str| {
        let calls = Arc::clone(calls);
        Callback::integer(move |_, _, power| {
            calls.lock().unwrap().push(name);
            Ok(Some(power + 1))
        })
    };
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "ability",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::BasePower, step(&calls, "ability")).scope(Scope::Any)),
    );
    attach(
        &mut battle,
        Holder::Field,
        "second",
        EffectKind::PseudoWeather,
        table(HandlerDescriptor::on(EventKind::BasePower, step(&calls, "pseudo-a")).scope(Scope::Any)),
    );
    attach(
        &mut battle,
        Holder::Field,
        "third",
        EffectKind::PseudoWeather,
        table(HandlerDescriptor::on(EventKind::BasePower, step(&calls, "pseudo-b")).scope(Scope::Any)),
    );
    attach(
        &mut battle,
        Holder::Side(SideId::P2),
        "sidecondition",
        EffectKind::SideCondition,
        table(HandlerDescriptor::on(EventKind::BasePower, step(&calls, "side")).scope(Scope::Any)),
    );

    let relay = run_event(&mut battle, EventKind::BasePower, eevee(), Some(pikachu()), None, RelayValue::Int(40)).unwrap();
    assert_eq!(relay, RelayValue::Int(44));
    assert_eq!(*calls.lock().unwrap(), vec!["side", "pseudo-a", "pseudo-b", "ability"]);
}

#[test]
fn test_identical_boards_dispatch_identically() {
    let order_for = || {
        let mut battle = create_doubles_battle(
            vec![
                TestPokemonBuilder::new("Pikachu").with_speed(90).build(),
                TestPokemonBuilder::new("Eevee").with_speed(90).build(),
            ],
            vec![
                TestPokemonBuilder::new("Charmander").with_speed(90).build(),
                TestPokemonBuilder::new("Squirtle").with_speed(90).build(),
            ],
        );
        for (side, slot, id) in [(SideId::P2, 1, "d"), (SideId::P1, 0, "a"), (SideId::P2, 0, "c"), (SideId::P1, 1, "b")] {
            attach(
                &mut battle,
                Holder::Pokemon(PokemonRef::new(side, slot)),
                id,
                EffectKind::Ability,
                table(
                    HandlerDescriptor::on(EventKind::Residual, Callback::action(|_, _| Ok(())))
                        .scope(Scope::Any),
                ),
            );
        }
        handler_order(&battle, EventKind::Residual, PokemonRef::new(SideId::P1, 0), None)
            .unwrap()
            .into_iter()
            .map(|(_, effect, _)| effect.to_string())
            .collect::<Vec<_>>()
    };

    let first = order_for();
    // Equal speed: registration decides, and it decides the same way every time.
    assert_eq!(first, vec!["d", "a", "c", "b"]);
    assert_eq!(first, order_for());
}

#[test]
fn test_veto_short_circuits_later_handlers() {
    let mut battle = speedy_battle();
    let calls = Calls::default();

    let gate = |calls: &Calls, name: &'static str, answer: Option<bool>| {
        let calls = Arc::clone(calls);
        Callback::gate(move |_, _| {
            calls.lock().unwrap().push(name);
            Ok(answer)
        })
    };
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "watcher",
        EffectKind::Volatile,
        table(HandlerDescriptor::on(EventKind::TryHit, gate(&calls, "watcher", None)).order(1)),
    );
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "protect",
        EffectKind::Volatile,
        table(HandlerDescriptor::on(EventKind::TryHit, gate(&calls, "protect", Some(false))).order(2)),
    );
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "late",
        EffectKind::Item,
        table(HandlerDescriptor::on(EventKind::TryHit, gate(&calls, "late", Some(true))).order(3)),
    );

    let relay = run_event(&mut battle, EventKind::TryHit, eevee(), Some(pikachu()), None, RelayValue::Bool(true)).unwrap();
    assert_eq!(relay, RelayValue::Bool(false));
    assert!(!relay.passes());
    assert_eq!(*calls.lock().unwrap(), vec!["watcher", "protect"]);
}

#[test]
fn test_absent_keeps_the_relay_and_stop_halts() {
    let mut battle = speedy_battle();

    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "indifferent",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::Accuracy, Callback::integer_or_stop(|_, _, _| Ok(Outcome::Pass))).order(1)),
    );
    let relay = run_event(&mut battle, EventKind::Accuracy, eevee(), Some(pikachu()), None, RelayValue::Int(90)).unwrap();
    assert_eq!(relay, RelayValue::Int(90));

    // A pass followed by a set in the same firing keeps the set.
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "haze",
        EffectKind::Volatile,
        table(HandlerDescriptor::on(EventKind::Accuracy, Callback::integer_or_stop(|_, _, _| Ok(Outcome::Set(70)))).order(2)),
    );
    let relay = run_event(&mut battle, EventKind::Accuracy, eevee(), Some(pikachu()), None, RelayValue::Int(90)).unwrap();
    assert_eq!(relay, RelayValue::Int(70));

    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "dodge",
        EffectKind::Item,
        table(HandlerDescriptor::on(EventKind::Accuracy, Callback::integer_or_stop(|_, _, _| Ok(Outcome::Stop))).order(3)),
    );
    let relay = run_event(&mut battle, EventKind::Accuracy, eevee(), Some(pikachu()), None, RelayValue::Int(90)).unwrap();
    assert_eq!(relay, RelayValue::Bool(false));
}

#[test]
fn test_absent_decimal_keeps_the_multiplier() {
    let mut battle = speedy_battle();
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "unmoved",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::ModifyAccuracy, Callback::decimal(|_, _, _| Ok(None))).order(1)),
    );
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "sandveil",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::ModifyAccuracy, Callback::decimal(|_, _, _| Ok(Some(0.5)))).order(2)),
    );

    let relay = run_event(&mut battle, EventKind::ModifyAccuracy, pikachu(), Some(eevee()), None, RelayValue::decimal(1.0)).unwrap();
    assert_eq!(relay, RelayValue::decimal(0.5));
}

#[test]
fn test_forced_hit_ends_the_accuracy_firing() {
    let mut battle = speedy_battle();
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "noguard",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::Accuracy, Callback::constant(RelayValue::Bool(true))).scope(Scope::Source)),
    );
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "brightpowder",
        EffectKind::Item,
        table(HandlerDescriptor::on(
            EventKind::Accuracy,
            Callback::integer_or_stop(|_, _, accuracy| Ok(Outcome::Set(accuracy - 10))),
        )),
    );

    // The faster source answers first; the item never sees a bool relay.
    let relay = run_event(&mut battle, EventKind::Accuracy, eevee(), Some(pikachu()), None, RelayValue::Int(100)).unwrap();
    assert_eq!(relay, RelayValue::Bool(true));
}

#[test]
fn test_holder_switched_out_mid_firing_is_an_error() {
    let mut battle = speedy_battle();
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "whirlwind",
        EffectKind::Ability,
        table(
            HandlerDescriptor::on(
                EventKind::BeforeTurn,
                Callback::action(|battle, _| {
                    execute_command(battle, BattleCommand::SwitchOut { pokemon: eevee() })?;
                    Ok(())
                }),
            )
            .scope(Scope::Any),
        ),
    );
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "lookout",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::BeforeTurn, Callback::action(|_, _| Ok(()))).scope(Scope::Foe)),
    );

    let err = run_event(&mut battle, EventKind::BeforeTurn, pikachu(), None, None, RelayValue::Absent).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::HolderLeftField { kind: EventKind::BeforeTurn, holder } if holder == eevee()
    ));
    assert_eq!(battle.event_depth, 0);
}

#[test]
fn test_holder_leaving_mid_turn_aborts_the_battle() {
    let mut battle = speedy_battle();
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "whirlwind",
        EffectKind::Ability,
        table(
            HandlerDescriptor::on(
                EventKind::BeforeTurn,
                Callback::action(|battle, _| {
                    execute_command(battle, BattleCommand::SwitchOut { pokemon: eevee() })?;
                    Ok(())
                }),
            )
            .scope(Scope::Any),
        ),
    );
    attach(
        &mut battle,
        Holder::Pokemon(eevee()),
        "lookout",
        EffectKind::Ability,
        table(HandlerDescriptor::on(EventKind::BeforeTurn, Callback::action(|_, _| Ok(()))).scope(Scope::Foe)),
    );

    for (attacker, defender) in [(pikachu(), eevee()), (eevee(), pikachu())] {
        let choice = MoveChoice::new(&battle, attacker, "tackle".into(), false, Some(NormalTarget::Foe(0)), vec![defender]).unwrap();
        submit_choice(&mut battle, Choice::Single(SlotChoice::Move(choice))).unwrap();
    }

    assert!(resolve_turn(&mut battle).is_err());
    assert_eq!(battle.game_state, GameState::Aborted { forfeited: None });
    assert!(battle
        .log
        .events()
        .iter()
        .any(|event| matches!(event, BattleEvent::BattleAborted { .. })));
}

#[test]
fn test_priority_event_takes_the_first_answer() {
    let mut battle = speedy_battle();
    let answer = |id: &'static str| {
        Callback::raw(
            crate::events::Signature::new(None, crate::events::RelayKinds::ABSENT | crate::events::RelayKinds::MOVE),
            move |_, _| Ok(RelayValue::Move(id.into())),
        )
    };
    attach(&mut battle, Holder::Pokemon(pikachu()), "lock-a", EffectKind::Volatile, table(HandlerDescriptor::on(EventKind::LockMove, answer("tackle"))));
    attach(&mut battle, Holder::Pokemon(pikachu()), "lock-b", EffectKind::Volatile, table(HandlerDescriptor::on(EventKind::LockMove, answer("ember"))));

    let relay = priority_event(&mut battle, EventKind::LockMove, pikachu(), None, RelayValue::Absent).unwrap();
    assert_eq!(relay, RelayValue::Move("tackle".into()));
}

#[test]
fn test_wrong_initial_relay_is_rejected() {
    let mut battle = speedy_battle();
    let err = run_event(&mut battle, EventKind::ModifyDamage, eevee(), None, None, RelayValue::Bool(true)).unwrap_err();
    assert!(matches!(err, DispatchError::RelayTypeMismatch { kind: EventKind::ModifyDamage, .. }));

    let err = run_event(&mut battle, EventKind::FieldResidual, eevee(), None, None, RelayValue::Absent).unwrap_err();
    assert!(matches!(err, DispatchError::TargetShapeMismatch { .. }));
}

#[test]
fn test_nested_firings_stop_at_the_depth_limit() {
    let mut battle = speedy_battle();
    attach(
        &mut battle,
        Holder::Pokemon(pikachu()),
        "echo",
        EffectKind::Volatile,
        table(HandlerDescriptor::on(
            EventKind::AfterMove,
            Callback::action(|battle, ctx| {
                let target = ctx.target_pokemon()?;
                run_event(battle, EventKind::AfterMove, target, None, None, RelayValue::Absent)?;
                Ok(())
            }),
        )),
    );

    let err = run_event(&mut battle, EventKind::AfterMove, pikachu(), None, None, RelayValue::Absent).unwrap_err();
    assert!(matches!(err, DispatchError::DepthExceeded { .. }));
    // The counter unwinds even on the error path.
    assert_eq!(battle.event_depth, 0);
}

#[test]
fn test_undeclared_return_is_an_error() {
    let mut battle = speedy_battle();
    // Declares Int but returns Types; only the dispatcher can catch that.
    let liar = Callback::raw(
        crate::events::Signature::new(Some(crate::events::RelayKind::Int), crate::events::RelayKinds::ABSENT | crate::events::RelayKinds::INT),
        |_, _| Ok(RelayValue::Types(Vec::new())),
    );
    attach(&mut battle, Holder::Pokemon(eevee()), "liar", EffectKind::Ability, table(HandlerDescriptor::on(EventKind::ModifyDamage, liar)));

    let err = run_event(&mut battle, EventKind::ModifyDamage, eevee(), None, None, RelayValue::Int(10)).unwrap_err();
    assert!(matches!(err, DispatchError::UndeclaredRelay { .. }));
}
