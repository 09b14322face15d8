use std::sync::{Arc, Mutex};

use crate::battle::commands::{execute_command, BattleCommand};
use crate::battle::state::{BattleEvent, BattleState};
use crate::battle::tests::common::{create_test_battle, TestPokemonBuilder};
use crate::effects::{EffectKind, EffectSource};
use crate::events::{field_event, Callback, EventKind, HandlerDescriptor, HandlerTable, Holder};
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

fn pikachu() -> PokemonRef {
    PokemonRef::new(SideId::P1, 0)
}

fn eevee() -> PokemonRef {
    PokemonRef::new(SideId::P2, 0)
}

fn battle() -> BattleState {
    create_test_battle(
        vec![TestPokemonBuilder::new("Pikachu").with_speed(100).build()],
        vec![TestPokemonBuilder::new("Eevee").with_speed(80).build()],
    )
}

fn source(id: &str, kind: EffectKind, table: HandlerTable) -> EffectSource {
    EffectSource::new(id.into(), kind, Arc::new(table))
}

#[test]
fn test_residuals_run_in_one_speed_ordered_pass() {
    let mut battle = battle();
    let calls = Calls::default();

    battle.attach(
        Holder::Field,
        source(
            "fieldtick",
            EffectKind::PseudoWeather,
            HandlerTable::new()
                .with(HandlerDescriptor::on(EventKind::FieldResidual, record(&calls, "field")))
                .unwrap(),
        ),
    );
    battle.attach(
        Holder::Side(SideId::P2),
        source(
            "sidetick",
            EffectKind::SideCondition,
            HandlerTable::new()
                .with(HandlerDescriptor::on(EventKind::SideResidual, record(&calls, "side")))
                .unwrap(),
        ),
    );
    battle.attach(
        Holder::Pokemon(eevee()),
        source(
            "slowitem",
            EffectKind::Item,
            HandlerTable::new()
                .with(HandlerDescriptor::on(EventKind::Residual, record(&calls, "eevee")))
                .unwrap(),
        ),
    );
    battle.attach(
        Holder::Pokemon(pikachu()),
        source(
            "fastvolatile",
            EffectKind::Volatile,
            HandlerTable::new()
                .with(HandlerDescriptor::on(EventKind::Residual, record(&calls, "pikachu")))
                .unwrap(),
        ),
    );

    field_event(&mut battle).unwrap();
    // Creatures by speed, then the holders without speed by sub-order.
    assert_eq!(*calls.lock().unwrap(), vec!["pikachu", "eevee", "side", "field"]);
}

#[test]
fn test_expiring_effect_ends_instead_of_ticking() {
    let mut battle = battle();
    let calls = Calls::default();

    let table = HandlerTable::new()
        .with(HandlerDescriptor::on(EventKind::Residual, record(&calls, "tick")))
        .unwrap()
        .with(HandlerDescriptor::on(EventKind::End, record(&calls, "end")))
        .unwrap();
    battle.attach(
        Holder::Pokemon(pikachu()),
        source("brief", EffectKind::Volatile, table).with_duration(2),
    );

    field_event(&mut battle).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["tick"]);
    assert!(battle.pokemon(pikachu()).unwrap().has_volatile(&"brief".into()));

    field_event(&mut battle).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["tick", "end"]);
    assert!(!battle.pokemon(pikachu()).unwrap().has_volatile(&"brief".into()));
    assert!(battle.drain_log().events().contains(&BattleEvent::ConditionExpired {
        holder: Holder::Pokemon(pikachu()),
        effect: "brief".into(),
    }));
}

#[test]
fn test_side_condition_counts_down_from_its_duration() {
    let mut battle = battle();
    let started = execute_command(
        &mut battle,
        BattleCommand::AddSideCondition {
            side: SideId::P1,
            condition: "reflect".into(),
            source: Some(pikachu()),
            duration: Some(2),
        },
    )
    .unwrap();
    assert!(started);

    field_event(&mut battle).unwrap();
    assert!(battle.side(SideId::P1).has_side_condition(&"reflect".into()));
    field_event(&mut battle).unwrap();
    assert!(!battle.side(SideId::P1).has_side_condition(&"reflect".into()));
}

#[test]
fn test_fainted_holder_does_not_tick() {
    let mut battle = battle();
    let calls = Calls::default();
    battle.attach(
        Holder::Pokemon(eevee()),
        source(
            "ghostly",
            EffectKind::Volatile,
            HandlerTable::new()
                .with(HandlerDescriptor::on(EventKind::Residual, record(&calls, "eevee")))
                .unwrap(),
        ),
    );
    battle.pokemon_mut(eevee()).unwrap().set_hp(0);

    field_event(&mut battle).unwrap();
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_source_removed_earlier_in_the_pass_is_skipped() {
    let mut battle = battle();
    let calls = Calls::default();

    let cleanser = HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::Residual,
            Callback::action(|battle, _| {
                execute_command(
                    battle,
                    BattleCommand::RemoveVolatile {
                        target: PokemonRef::new(SideId::P2, 0),
                        effect: "doomed".into(),
                    },
                )?;
                Ok(())
            }),
        ))
        .unwrap();
    battle.attach(Holder::Pokemon(pikachu()), source("cleanser", EffectKind::Volatile, cleanser));
    battle.attach(
        Holder::Pokemon(eevee()),
        source(
            "doomed",
            EffectKind::Volatile,
            HandlerTable::new()
                .with(HandlerDescriptor::on(EventKind::Residual, record(&calls, "doomed")))
                .unwrap(),
        ),
    );

    field_event(&mut battle).unwrap();
    assert!(calls.lock().unwrap().is_empty());
    assert!(!battle.pokemon(eevee()).unwrap().has_volatile(&"doomed".into()));
}

#[test]
fn test_wish_heals_whoever_holds_the_slot_when_it_lands() {
    let mut battle = battle();
    battle.pokemon_mut(pikachu()).unwrap().set_hp(40);
    execute_command(
        &mut battle,
        BattleCommand::AddSlotCondition {
            side: SideId::P1,
            slot: 0,
            condition: "wish".into(),
            duration: Some(2),
        },
    )
    .unwrap();

    field_event(&mut battle).unwrap();
    assert_eq!(battle.pokemon(pikachu()).unwrap().current_hp, 40);

    field_event(&mut battle).unwrap();
    assert_eq!(battle.pokemon(pikachu()).unwrap().current_hp, 90);
    assert!(battle.side(SideId::P1).slot_conditions[0].is_empty());
}
