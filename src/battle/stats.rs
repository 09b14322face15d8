use crate::battle::state::BattleState;
use crate::errors::{DispatchError, DispatchResult};
use crate::events::{run_event, EventKind, RelayValue};
use crate::moves::MoveData;
use crate::pokemon::PokemonRef;
use schema::{MoveCategory, PokemonType, StatTable, StatType};

/// Stats after `CalculateStats` handlers and stat stages.
pub fn calculated_stats(battle: &mut BattleState, pokemon: PokemonRef) -> DispatchResult<StatTable> {
    let inst = battle
        .pokemon(pokemon)
        .ok_or(DispatchError::UnknownCreature(pokemon))?;
    let base = inst.stats;
    let boosts: Vec<(StatType, i8)> = StatType::permanent()
        .into_iter()
        .map(|stat| (stat, inst.boost(stat)))
        .collect();

    let relay = run_event(
        battle,
        EventKind::CalculateStats,
        pokemon,
        None,
        None,
        RelayValue::Stats(base),
    )?;
    let mut stats = relay.as_stats().unwrap_or(base);
    for (stat, stage) in boosts {
        if stat != StatType::Hp {
            stats.set(stat, apply_stat_stage_multiplier(stats.get(stat), stage));
        }
    }
    Ok(stats)
}

/// Speed used for turn order: boosted speed, then `ModifySpe` handlers.
pub fn effective_speed(battle: &mut BattleState, pokemon: PokemonRef) -> DispatchResult<u32> {
    let speed = calculated_stats(battle, pokemon)?.speed;
    let relay = run_event(
        battle,
        EventKind::ModifySpe,
        pokemon,
        None,
        None,
        RelayValue::Int(i32::from(speed)),
    )?;
    Ok(relay.as_int().unwrap_or(0).max(0) as u32)
}

/// The attacking stat a move uses, after modifiers on the attacker.
pub fn effective_attack(
    battle: &mut BattleState,
    attacker: PokemonRef,
    defender: PokemonRef,
    category: MoveCategory,
) -> DispatchResult<u32> {
    let (stat, kind) = match category {
        MoveCategory::Physical => (StatType::Attack, EventKind::ModifyAtk),
        MoveCategory::Special => (StatType::SpecialAttack, EventKind::ModifySpA),
        MoveCategory::Status => return Ok(0),
    };
    let base = calculated_stats(battle, attacker)?.get(stat);
    let relay = run_event(battle, kind, attacker, Some(defender), None, RelayValue::Int(i32::from(base)))?;
    Ok(relay.as_int().unwrap_or(0).max(1) as u32)
}

/// The defending stat a move is checked against.
pub fn effective_defense(
    battle: &mut BattleState,
    attacker: PokemonRef,
    defender: PokemonRef,
    category: MoveCategory,
) -> DispatchResult<u32> {
    let (stat, kind) = match category {
        MoveCategory::Physical => (StatType::Defense, EventKind::ModifyDef),
        MoveCategory::Special => (StatType::SpecialDefense, EventKind::ModifySpD),
        MoveCategory::Status => return Ok(0),
    };
    let base = calculated_stats(battle, defender)?.get(stat);
    let relay = run_event(battle, kind, defender, Some(attacker), None, RelayValue::Int(i32::from(base)))?;
    Ok(relay.as_int().unwrap_or(0).max(1) as u32)
}

/// Types after `Type` handlers (terastallization replaces them outright).
pub fn effective_types(battle: &mut BattleState, pokemon: PokemonRef) -> DispatchResult<Vec<PokemonType>> {
    let inst = battle
        .pokemon(pokemon)
        .ok_or(DispatchError::UnknownCreature(pokemon))?;
    let base = match (inst.terastallized, inst.tera_type) {
        (true, Some(tera)) => vec![tera],
        _ => inst.types.clone(),
    };
    let relay = run_event(battle, EventKind::Type, pokemon, None, None, RelayValue::Types(base.clone()))?;
    Ok(relay.as_types().map_or(base, <[PokemonType]>::to_vec))
}

/// Rolls whether `move_data` used by `attacker` hits `defender`.
///
/// The base accuracy is scaled by the accuracy/evasion stage difference and
/// by `ModifyAccuracy` handlers, then offered to `Accuracy` handlers, which
/// may replace it, force a hit with `true`, or force a miss with `false`.
pub fn move_hits(
    battle: &mut BattleState,
    attacker: PokemonRef,
    defender: PokemonRef,
    move_data: &MoveData,
) -> DispatchResult<bool> {
    // Moves without an accuracy value never miss.
    let Some(base_accuracy) = move_data.accuracy else {
        return Ok(true);
    };

    let accuracy_stage = battle.pokemon(attacker).map_or(0, |p| p.boost(StatType::Accuracy));
    let evasion_stage = battle.pokemon(defender).map_or(0, |p| p.boost(StatType::Evasion));
    let stage_multiplier = accuracy_stage_multiplier((accuracy_stage - evasion_stage).clamp(-6, 6));

    let modifier = run_event(
        battle,
        EventKind::ModifyAccuracy,
        defender,
        Some(attacker),
        None,
        RelayValue::decimal(1.0),
    )?
    .as_decimal()
    .unwrap_or(1.0);

    let accuracy = (f64::from(base_accuracy) * stage_multiplier * modifier).round() as i32;
    let relay = run_event(
        battle,
        EventKind::Accuracy,
        defender,
        Some(attacker),
        None,
        RelayValue::Int(accuracy),
    )?;

    let threshold = match relay {
        RelayValue::Bool(always) => return Ok(always),
        RelayValue::Int(value) => value.clamp(0, 100),
        _ => accuracy.clamp(0, 100),
    };
    let roll = battle.rng.next_outcome("accuracy check");
    Ok(i32::from(roll) <= threshold)
}

/// Accuracy/evasion stages use thirds rather than halves.
fn accuracy_stage_multiplier(stage: i8) -> f64 {
    let stage = f64::from(stage.clamp(-6, 6));
    if stage >= 0.0 {
        (3.0 + stage) / 3.0
    } else {
        3.0 / (3.0 - stage)
    }
}

/// Applies a stat stage (-6..=6): `(2 + s) / 2` when raised, `2 / (2 - s)`
/// when lowered.
pub fn apply_stat_stage_multiplier(base_stat: u16, stage: i8) -> u16 {
    let clamped_stage = stage.clamp(-6, 6);

    if clamped_stage == 0 {
        return base_stat;
    }

    let multiplier = if clamped_stage < 0 {
        2.0 / (2.0 + f64::from(-clamped_stage))
    } else {
        (2.0 + f64::from(clamped_stage)) / 2.0
    };

    (f64::from(base_stat) * multiplier).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::TurnRng;
    use crate::battle::tests::common::{create_test_battle, TestPokemonBuilder};
    use crate::effects::{EffectKind, EffectRegistry};
    use crate::events::{Callback, HandlerDescriptor, HandlerTable, Holder, Scope};
    use crate::moves::MoveId;
    use schema::SideId;
    use std::sync::Arc;

    #[test]
    fn test_stat_stage_multipliers() {
        assert_eq!(apply_stat_stage_multiplier(100, 0), 100);
        assert_eq!(apply_stat_stage_multiplier(100, 1), 150);
        assert_eq!(apply_stat_stage_multiplier(100, 2), 200);
        assert_eq!(apply_stat_stage_multiplier(100, -1), 67);
        assert_eq!(apply_stat_stage_multiplier(100, -2), 50);
        assert_eq!(apply_stat_stage_multiplier(100, 6), 400);
        assert_eq!(apply_stat_stage_multiplier(100, -6), 25);
    }

    #[test]
    fn test_accuracy_stage_multipliers() {
        assert!((accuracy_stage_multiplier(0) - 1.0).abs() < 0.001);
        assert!((accuracy_stage_multiplier(1) - 4.0 / 3.0).abs() < 0.001);
        assert!((accuracy_stage_multiplier(-1) - 3.0 / 4.0).abs() < 0.001);
        assert!((accuracy_stage_multiplier(6) - 3.0).abs() < 0.001);
        assert!((accuracy_stage_multiplier(-6) - 1.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_effective_speed_runs_modifiers() {
        let mut battle = create_test_battle(
            vec![TestPokemonBuilder::new("Pikachu").with_speed(100).build()],
            vec![TestPokemonBuilder::new("Eevee").build()],
        );
        let pikachu = PokemonRef::new(SideId::P1, 0);

        // A paralysis-style quarter-speed status.
        let table = HandlerTable::new()
            .with(HandlerDescriptor::on(
                EventKind::ModifySpe,
                Callback::integer(|_, _, speed| Ok(Some(speed / 4))),
            ))
            .unwrap();
        let mut registry = EffectRegistry::new();
        registry.register("par", table);
        let source = crate::effects::EffectCatalog::instantiate(&registry, &"par".into(), EffectKind::Status).unwrap();
        battle.attach(Holder::Pokemon(pikachu), source);

        assert_eq!(effective_speed(&mut battle, pikachu).unwrap(), 25);
    }

    #[test]
    fn test_defender_held_accuracy_modifier() {
        let mut battle = create_test_battle(
            vec![TestPokemonBuilder::new("Pikachu").build()],
            vec![TestPokemonBuilder::new("Eevee").build()],
        )
        .with_rng(TurnRng::new_for_test(vec![60]));
        let pikachu = PokemonRef::new(SideId::P1, 0);
        let eevee = PokemonRef::new(SideId::P2, 0);

        // Held by Eevee, shrinks the accuracy of moves aimed at it.
        let table = HandlerTable::new()
            .with(HandlerDescriptor::on(
                EventKind::ModifyAccuracy,
                Callback::decimal(|_, _, acc| Ok(Some(acc * 0.5))),
            ))
            .unwrap();
        battle.attach(
            Holder::Pokemon(eevee),
            crate::effects::EffectSource::new("brightpowder".into(), EffectKind::Item, Arc::new(table)),
        );

        let tackle = battle.moves.get(&MoveId::from("tackle")).cloned().unwrap();
        // 100 * 0.5 = 50, roll 60 misses.
        assert!(!move_hits(&mut battle, pikachu, eevee, &tackle).unwrap());
    }

    #[test]
    fn test_accuracy_handler_can_force_a_hit() {
        let mut battle = create_test_battle(
            vec![TestPokemonBuilder::new("Pikachu").build()],
            vec![TestPokemonBuilder::new("Eevee").build()],
        )
        .with_rng(TurnRng::new_for_test(vec![100]));
        let pikachu = PokemonRef::new(SideId::P1, 0);
        let eevee = PokemonRef::new(SideId::P2, 0);
        battle.pokemon_mut(eevee).unwrap().apply_boost(StatType::Evasion, 6);

        // No Guard-style: every move aimed from or at the holder lands.
        let table = HandlerTable::new()
            .with(
                HandlerDescriptor::on(EventKind::Accuracy, Callback::constant(RelayValue::Bool(true)))
                    .scope(Scope::Source),
            )
            .unwrap();
        battle.attach(
            Holder::Pokemon(pikachu),
            crate::effects::EffectSource::new("noguard".into(), EffectKind::Ability, Arc::new(table)),
        );

        let tackle = battle.moves.get(&MoveId::from("tackle")).cloned().unwrap();
        assert!(move_hits(&mut battle, pikachu, eevee, &tackle).unwrap());
    }
}
