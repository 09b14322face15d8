use crate::battle::state::{BattleEvent, BattleState};
use crate::effects::{EffectId, EffectKind, EffectSource};
use crate::errors::{BattleStateError, DispatchError, DispatchResult};
use crate::events::{run_event, run_event_with, single_event, EventKind, FireOptions, Holder, RelayValue};
use crate::pokemon::PokemonRef;
use schema::{SideId, StatType};
use tracing::debug;

/// Atomic state changes. Each one runs the gate events that may refuse it
/// and the notification events that follow it.
#[derive(Debug, Clone)]
pub enum BattleCommand {
    DealDamage {
        target: PokemonRef,
        amount: u16,
        source: Option<PokemonRef>,
        effect: Option<EffectId>,
    },
    Heal {
        target: PokemonRef,
        amount: u16,
        effect: Option<EffectId>,
    },
    SetStatus {
        target: PokemonRef,
        status: EffectId,
        source: Option<PokemonRef>,
        duration: Option<u8>,
    },
    CureStatus {
        target: PokemonRef,
    },
    AddVolatile {
        target: PokemonRef,
        effect: EffectId,
        source: Option<PokemonRef>,
        duration: Option<u8>,
    },
    RemoveVolatile {
        target: PokemonRef,
        effect: EffectId,
    },
    AddSlotCondition {
        side: SideId,
        slot: usize,
        condition: EffectId,
        duration: Option<u8>,
    },
    AddSideCondition {
        side: SideId,
        condition: EffectId,
        source: Option<PokemonRef>,
        duration: Option<u8>,
    },
    RemoveSideCondition {
        side: SideId,
        condition: EffectId,
    },
    SetWeather {
        weather: EffectId,
        source: Option<PokemonRef>,
        duration: Option<u8>,
    },
    ClearWeather,
    /// Terrain or a pseudo-weather.
    AddFieldEffect {
        effect: EffectId,
        kind: EffectKind,
        source: Option<PokemonRef>,
        duration: Option<u8>,
    },
    Boost {
        target: PokemonRef,
        stat: StatType,
        stages: i8,
    },
    SwitchOut {
        pokemon: PokemonRef,
    },
    SwitchIn {
        side: SideId,
        slot: usize,
        index: usize,
    },
    Faint {
        pokemon: PokemonRef,
    },
    EmitEvent(BattleEvent),
}

/// Execute a batch of commands in order. Returns how many took effect.
pub fn execute_command_batch(state: &mut BattleState, commands: Vec<BattleCommand>) -> DispatchResult<usize> {
    let mut applied = 0;
    for command in commands {
        if execute_command(state, command)? {
            applied += 1;
        }
    }
    Ok(applied)
}

/// Runs one command. `Ok(false)` means a handler or the board refused it;
/// only engine-invariant violations are errors.
pub fn execute_command(state: &mut BattleState, command: BattleCommand) -> DispatchResult<bool> {
    match command {
        BattleCommand::EmitEvent(event) => {
            state.log_event(event)?;
            Ok(true)
        }
        BattleCommand::DealDamage {
            target,
            amount,
            source,
            effect,
        } => deal_damage(state, target, amount, source, effect.as_ref()),
        BattleCommand::Heal {
            target,
            amount,
            effect,
        } => heal(state, target, amount, effect.as_ref()),
        BattleCommand::SetStatus {
            target,
            status,
            source,
            duration,
        } => set_status(state, target, status, source, duration),
        BattleCommand::CureStatus { target } => {
            let Some(order) = existing(state, target)?.status.as_ref().map(|s| s.state.effect_order) else {
                return Ok(false);
            };
            match remove_effect(state, Holder::Pokemon(target), order)? {
                Some(status) => {
                    state.log_event(BattleEvent::StatusCured { target, status })?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        BattleCommand::AddVolatile {
            target,
            effect,
            source,
            duration,
        } => add_volatile(state, target, effect, source, duration),
        BattleCommand::RemoveVolatile { target, effect } => {
            let Some(order) = existing(state, target)?
                .volatiles
                .iter()
                .find(|v| v.id == effect)
                .map(|v| v.state.effect_order)
            else {
                return Ok(false);
            };
            match remove_effect(state, Holder::Pokemon(target), order)? {
                Some(effect) => {
                    state.log_event(BattleEvent::VolatileRemoved { target, effect })?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        BattleCommand::AddSlotCondition {
            side,
            slot,
            condition,
            duration,
        } => {
            let holder = Holder::Slot { side, slot };
            let source = instantiate(state, &condition, EffectKind::SlotCondition, duration, None)?;
            start_effect(state, holder, source, None)
        }
        BattleCommand::AddSideCondition {
            side,
            condition,
            source,
            duration,
        } => {
            if state.side(side).has_side_condition(&condition) {
                return Ok(false);
            }
            let effect = instantiate(state, &condition, EffectKind::SideCondition, duration, source)?;
            let started = start_effect(state, Holder::Side(side), effect, source)?;
            if started {
                state.log_event(BattleEvent::SideConditionStarted { side, condition })?;
            }
            Ok(started)
        }
        BattleCommand::RemoveSideCondition { side, condition } => {
            let Some(order) = state
                .side(side)
                .side_conditions
                .iter()
                .find(|c| c.id == condition)
                .map(|c| c.state.effect_order)
            else {
                return Ok(false);
            };
            end_effect(state, Holder::Side(side), order)?;
            Ok(true)
        }
        BattleCommand::SetWeather {
            weather,
            source,
            duration,
        } => set_weather(state, weather, source, duration),
        BattleCommand::ClearWeather => {
            let Some(order) = state.field.weather.as_ref().map(|w| w.state.effect_order) else {
                return Ok(false);
            };
            end_effect(state, Holder::Field, order)?;
            Ok(true)
        }
        BattleCommand::AddFieldEffect {
            effect,
            kind,
            source,
            duration,
        } => {
            if state.field.attached().any(|e| e.id == effect) {
                return Ok(false);
            }
            let instance = instantiate(state, &effect, kind, duration, source)?;
            let started = start_effect(state, Holder::Field, instance, source)?;
            if started {
                state.log_event(BattleEvent::FieldEffectStarted { effect })?;
            }
            Ok(started)
        }
        BattleCommand::Boost { target, stat, stages } => {
            let (old_stage, new_stage) = state
                .pokemon_mut(target)
                .ok_or(DispatchError::UnknownCreature(target))?
                .apply_boost(stat, stages);
            state.log_event(BattleEvent::StatStageChanged {
                target,
                stat,
                old_stage,
                new_stage,
            })?;
            Ok(old_stage != new_stage)
        }
        BattleCommand::SwitchOut { pokemon } => switch_out(state, pokemon),
        BattleCommand::SwitchIn { side, slot, index } => switch_in(state, side, slot, index),
        BattleCommand::Faint { pokemon } => {
            run_event(state, EventKind::Faint, pokemon, None, None, RelayValue::Absent)?;
            state.log_event(BattleEvent::PokemonFainted { pokemon })?;
            run_event(state, EventKind::AfterFaint, pokemon, None, None, RelayValue::Absent)?;
            Ok(true)
        }
    }
}

fn existing(state: &BattleState, pokemon: PokemonRef) -> DispatchResult<&crate::pokemon::PokemonInst> {
    state.pokemon(pokemon).ok_or(DispatchError::UnknownCreature(pokemon))
}

fn instantiate(
    state: &BattleState,
    id: &EffectId,
    kind: EffectKind,
    duration: Option<u8>,
    source: Option<PokemonRef>,
) -> DispatchResult<EffectSource> {
    let mut effect = state.catalog.instantiate(id, kind).map_err(|e| match e {
        BattleStateError::UnknownEffect(id) => DispatchError::UnknownEffect(id),
        _ => DispatchError::UnknownEffect(id.clone()),
    })?;
    effect.state.duration = duration;
    effect.state.source = source;
    Ok(effect)
}

/// Attaches `effect` and fires its own start hook. A start hook that
/// returns `false` undoes the attachment.
fn start_effect(
    state: &mut BattleState,
    holder: Holder,
    effect: EffectSource,
    source: Option<PokemonRef>,
) -> DispatchResult<bool> {
    let id = effect.id.clone();
    let (order, displaced) = state.attach(holder, effect);
    if let Some(old) = displaced {
        debug!(%holder, replaced = %old.id, with = %id, "effect displaced");
    }

    let occupant = match holder {
        Holder::Slot { side, slot } => state.occupant(side, slot),
        _ => None,
    };
    let Some(start) = EventKind::start_for(holder.as_target(occupant).shape()) else {
        return Ok(true);
    };
    let result = single_event(state, start, holder, order, source, None, RelayValue::Absent)?;
    if !result.passes() {
        debug!(%holder, effect = %id, "start hook refused the effect");
        state.detach(holder, order);
        return Ok(false);
    }
    Ok(true)
}

/// Fires an attached effect's own end hook and detaches it. Returns the
/// id of what was removed.
fn remove_effect(state: &mut BattleState, holder: Holder, effect_order: u64) -> DispatchResult<Option<EffectId>> {
    let occupant = match holder {
        Holder::Slot { side, slot } => state.occupant(side, slot),
        _ => None,
    };
    if let Some(end) = EventKind::end_for(holder.as_target(occupant).shape()) {
        single_event(state, end, holder, effect_order, None, None, RelayValue::Absent)?;
    }
    Ok(state.detach(holder, effect_order).map(|effect| effect.id))
}

/// Ends an effect whose time is up (or that something else removed).
pub fn end_effect(state: &mut BattleState, holder: Holder, effect_order: u64) -> DispatchResult<()> {
    if let Some(effect) = remove_effect(state, holder, effect_order)? {
        debug!(%holder, %effect, "effect ended");
        state.log_event(BattleEvent::ConditionExpired { holder, effect })?;
    }
    Ok(())
}

fn deal_damage(
    state: &mut BattleState,
    target: PokemonRef,
    amount: u16,
    source: Option<PokemonRef>,
    effect: Option<&EffectId>,
) -> DispatchResult<bool> {
    if existing(state, target)?.is_fainted() {
        return Ok(false);
    }
    let relay = run_event(state, EventKind::Damage, target, source, effect, RelayValue::Int(i32::from(amount)))?;
    let Some(amount) = relay.as_int().filter(|amount| *amount > 0) else {
        return Ok(false);
    };

    let pokemon = state
        .pokemon_mut(target)
        .ok_or(DispatchError::UnknownCreature(target))?;
    let damage = pokemon.take_damage(u16::try_from(amount).unwrap_or(u16::MAX));
    let remaining_hp = pokemon.current_hp;
    state.log_event(BattleEvent::DamageDealt {
        target,
        damage,
        remaining_hp,
    })?;
    if remaining_hp == 0 {
        execute_command(state, BattleCommand::Faint { pokemon: target })?;
    }
    Ok(true)
}

fn heal(state: &mut BattleState, target: PokemonRef, amount: u16, effect: Option<&EffectId>) -> DispatchResult<bool> {
    let pokemon = existing(state, target)?;
    if pokemon.is_fainted() || pokemon.current_hp == pokemon.max_hp() {
        return Ok(false);
    }
    let relay = run_event(state, EventKind::TryHeal, target, None, effect, RelayValue::Int(i32::from(amount)))?;
    let Some(amount) = relay.as_int().filter(|amount| *amount > 0) else {
        return Ok(false);
    };

    let pokemon = state
        .pokemon_mut(target)
        .ok_or(DispatchError::UnknownCreature(target))?;
    let amount = pokemon.heal(u16::try_from(amount).unwrap_or(u16::MAX));
    let new_hp = pokemon.current_hp;
    state.log_event(BattleEvent::PokemonHealed {
        target,
        amount,
        new_hp,
    })?;
    Ok(true)
}

fn set_status(
    state: &mut BattleState,
    target: PokemonRef,
    status: EffectId,
    source: Option<PokemonRef>,
    duration: Option<u8>,
) -> DispatchResult<bool> {
    let pokemon = existing(state, target)?;
    if pokemon.is_fainted() || pokemon.status.is_some() {
        return Ok(false);
    }
    let gate = run_event(
        state,
        EventKind::SetStatus,
        target,
        source,
        None,
        RelayValue::Effect(status.clone()),
    )?;
    if !gate.passes() {
        return Ok(false);
    }

    let effect = instantiate(state, &status, EffectKind::Status, duration, source)?;
    if !start_effect(state, Holder::Pokemon(target), effect, source)? {
        return Ok(false);
    }
    state.log_event(BattleEvent::StatusApplied {
        target,
        status: status.clone(),
    })?;
    run_event(
        state,
        EventKind::AfterSetStatus,
        target,
        source,
        Some(&status),
        RelayValue::Effect(status.clone()),
    )?;
    Ok(true)
}

fn add_volatile(
    state: &mut BattleState,
    target: PokemonRef,
    effect: EffectId,
    source: Option<PokemonRef>,
    duration: Option<u8>,
) -> DispatchResult<bool> {
    let pokemon = existing(state, target)?;
    if pokemon.is_fainted() || pokemon.has_volatile(&effect) {
        return Ok(false);
    }
    let gate = run_event(
        state,
        EventKind::TryAddVolatile,
        target,
        source,
        None,
        RelayValue::Effect(effect.clone()),
    )?;
    if !gate.passes() {
        return Ok(false);
    }

    let volatile = instantiate(state, &effect, EffectKind::Volatile, duration, source)?;
    if !start_effect(state, Holder::Pokemon(target), volatile, source)? {
        return Ok(false);
    }
    state.log_event(BattleEvent::VolatileAdded { target, effect })?;
    Ok(true)
}

fn set_weather(
    state: &mut BattleState,
    weather: EffectId,
    source: Option<PokemonRef>,
    duration: Option<u8>,
) -> DispatchResult<bool> {
    if state.field.has_weather(&weather) {
        return Ok(false);
    }
    let options = FireOptions::from_source(source, Some(&weather));
    let gate = run_event_with(
        state,
        EventKind::SetWeather,
        crate::events::EventTarget::Field,
        RelayValue::Effect(weather.clone()),
        &options,
    )?;
    if !gate.passes() {
        return Ok(false);
    }

    let effect = instantiate(state, &weather, EffectKind::Weather, duration, source)?;
    if !start_effect(state, Holder::Field, effect, source)? {
        return Ok(false);
    }
    state.log_event(BattleEvent::FieldEffectStarted { effect: weather })?;
    Ok(true)
}

fn switch_out(state: &mut BattleState, pokemon: PokemonRef) -> DispatchResult<bool> {
    let Some(slot) = state.slot_of(pokemon) else {
        return Ok(false);
    };
    if !existing(state, pokemon)?.is_fainted() {
        run_event(state, EventKind::SwitchOut, pokemon, None, None, RelayValue::Absent)?;
    }

    // Volatiles go quietly; their end hooks do not fire on a switch.
    let cleared = state
        .pokemon_mut(pokemon)
        .ok_or(DispatchError::UnknownCreature(pokemon))?
        .clear_on_switch_out();
    debug!(%pokemon, volatiles = cleared.len(), "switched out");
    if let Some(active) = state.side_mut(pokemon.side).active.get_mut(slot) {
        *active = None;
    }
    state.log_event(BattleEvent::PokemonSwitchedOut { pokemon, slot })?;
    Ok(true)
}

fn switch_in(state: &mut BattleState, side: SideId, slot: usize, index: usize) -> DispatchResult<bool> {
    let pokemon = PokemonRef::new(side, index);
    if existing(state, pokemon)?.is_fainted() || state.slot_of(pokemon).is_some() {
        return Ok(false);
    }
    let Some(active) = state.side_mut(side).active.get_mut(slot) else {
        return Ok(false);
    };
    *active = Some(index);
    if let Some(inst) = state.pokemon_mut(pokemon) {
        inst.position = Some(slot);
    }
    state.log_event(BattleEvent::PokemonSwitchedIn { pokemon, slot })?;
    run_event(state, EventKind::SwitchIn, pokemon, None, None, RelayValue::Absent)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{assert_ok_false, assert_ok_true, create_test_battle, test_registry, TestPokemonBuilder};
    use crate::events::{Callback, HandlerDescriptor, HandlerTable, Scope};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn p1() -> PokemonRef {
        PokemonRef::new(SideId::P1, 0)
    }

    fn p2() -> PokemonRef {
        PokemonRef::new(SideId::P2, 0)
    }

    fn battle() -> BattleState {
        create_test_battle(
            vec![TestPokemonBuilder::new("Pikachu").build()],
            vec![TestPokemonBuilder::new("Charmander").build()],
        )
    }

    #[test]
    fn test_deal_damage_command() {
        let mut state = battle();
        state.drain_log();

        let applied = execute_command(
            &mut state,
            BattleCommand::DealDamage {
                target: p2(),
                amount: 30,
                source: Some(p1()),
                effect: None,
            },
        )
        .unwrap();

        assert!(applied);
        assert_eq!(state.pokemon(p2()).unwrap().current_hp, 70);
        assert_eq!(
            state.log.events(),
            &[BattleEvent::DamageDealt {
                target: p2(),
                damage: 30,
                remaining_hp: 70
            }]
        );
    }

    #[test]
    fn test_damage_handler_returning_zero_prevents_damage() {
        let mut state = battle();
        let table = HandlerTable::new()
            .with(HandlerDescriptor::on(
                EventKind::Damage,
                Callback::integer(|_, _, _| Ok(Some(0))),
            ))
            .unwrap();
        state.attach(
            Holder::Pokemon(p2()),
            EffectSource::new("magicguard".into(), EffectKind::Ability, Arc::new(table)),
        );

        let applied = execute_command(
            &mut state,
            BattleCommand::DealDamage {
                target: p2(),
                amount: 30,
                source: None,
                effect: None,
            },
        )
        .unwrap();
        assert!(!applied);
        assert_eq!(state.pokemon(p2()).unwrap().current_hp, 100);
    }

    #[test]
    fn test_set_status_attaches_and_logs() {
        let mut state = battle();
        state.drain_log();

        assert_ok_true(execute_command(
            &mut state,
            BattleCommand::SetStatus {
                target: p2(),
                status: "brn".into(),
                source: Some(p1()),
                duration: None,
            },
        ));
        assert!(state.pokemon(p2()).unwrap().has_status(&"brn".into()));

        // A second status never overwrites the first.
        assert_ok_false(execute_command(
            &mut state,
            BattleCommand::SetStatus {
                target: p2(),
                status: "par".into(),
                source: None,
                duration: None,
            },
        ));
    }

    #[test]
    fn test_set_status_gate_veto() {
        let mut state = battle();
        // Safeguard-style side condition on P2 refuses every status.
        let table = HandlerTable::new()
            .with(
                HandlerDescriptor::on(EventKind::SetStatus, Callback::gate(|_, _| Ok(Some(false))))
                    .scope(Scope::Own),
            )
            .unwrap();
        state.attach(
            Holder::Side(SideId::P2),
            EffectSource::new("safeguard".into(), EffectKind::SideCondition, Arc::new(table)),
        );

        let applied = execute_command(
            &mut state,
            BattleCommand::SetStatus {
                target: p2(),
                status: "brn".into(),
                source: Some(p1()),
                duration: None,
            },
        )
        .unwrap();
        assert!(!applied);
        assert!(state.pokemon(p2()).unwrap().status.is_none());
    }

    #[test]
    fn test_unknown_effect_is_a_dispatch_error() {
        let mut state = battle();
        let err = execute_command(
            &mut state,
            BattleCommand::AddVolatile {
                target: p1(),
                effect: "doesnotexist".into(),
                source: None,
                duration: None,
            },
        )
        .unwrap_err();
        assert_eq!(err, DispatchError::UnknownEffect("doesnotexist".into()));
    }

    #[test]
    fn test_switch_out_drops_volatiles_and_slot() {
        let mut state = create_test_battle(
            vec![
                TestPokemonBuilder::new("Pikachu").build(),
                TestPokemonBuilder::new("Eevee").build(),
            ],
            vec![TestPokemonBuilder::new("Charmander").build()],
        );
        execute_command(
            &mut state,
            BattleCommand::AddVolatile {
                target: p1(),
                effect: "confusion".into(),
                source: None,
                duration: Some(3),
            },
        )
        .unwrap();

        assert!(execute_command(&mut state, BattleCommand::SwitchOut { pokemon: p1() }).unwrap());
        assert!(state.pokemon(p1()).unwrap().volatiles.is_empty());
        assert_eq!(state.side(SideId::P1).occupant(0), None);

        assert!(execute_command(
            &mut state,
            BattleCommand::SwitchIn {
                side: SideId::P1,
                slot: 0,
                index: 1
            }
        )
        .unwrap());
        assert!(state.is_on_field(PokemonRef::new(SideId::P1, 1)));
        assert!(!state.is_on_field(p1()));
    }

    #[test]
    fn test_weather_replaces_and_clears() {
        let mut state = battle();
        assert!(execute_command(
            &mut state,
            BattleCommand::SetWeather {
                weather: "raindance".into(),
                source: Some(p1()),
                duration: Some(5),
            },
        )
        .unwrap());
        assert!(state.field.has_weather(&"raindance".into()));
        assert!(execute_command(&mut state, BattleCommand::ClearWeather).unwrap());
        assert!(state.field.weather.is_none());
        assert!(!execute_command(&mut state, BattleCommand::ClearWeather).unwrap());
        assert!(test_registry().contains(&"raindance".into()));
    }
}
