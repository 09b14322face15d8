use crate::battle::action_stack::{ActionStack, BattleAction};
use crate::battle::commands::{execute_command, execute_command_batch, BattleCommand};
use crate::battle::state::{ActionFailureReason, ActiveMove, BattleEvent, BattleState, EventBus, GameState};
use crate::battle::stats::{effective_attack, effective_defense, effective_types, move_hits};
use crate::choices::{can_terastallize, target_options, Choice, MoveChoice, NormalTarget, SlotChoice};
use crate::decision::build_request;
use crate::effects::{EffectId, EffectKind};
use crate::errors::{BattleEngineError, BattleResult, BattleStateError};
use crate::events::{
    each_event, field_event, priority_event, run_event, EventKind, EventTarget, Holder, RelayValue,
};
use crate::moves::{MoveData, MoveId};
use crate::pokemon::PokemonRef;
use schema::{MoveCategory, MoveTarget, SideId};
use tracing::{debug, error, info};

/// Announces the battle and runs start-of-battle hooks. The battle stays
/// in team preview until both orders are in.
pub fn start_battle(battle: &mut BattleState) -> BattleResult<EventBus> {
    if battle.started {
        return Err(BattleStateError::WrongGameState(battle.game_state).into());
    }
    for side in &battle.sides {
        let needed = battle.game_type.active_slots();
        if side.roster.len() < needed {
            return Err(BattleStateError::RosterTooSmall {
                side: side.id,
                needed,
                found: side.roster.len(),
            }
            .into());
        }
    }
    battle.started = true;
    info!(battle_id = %battle.battle_id, game_type = %battle.game_type, "battle starting");
    guarded(battle, |battle| {
        battle.log_event(BattleEvent::BattleStarted {
            game_type: battle.game_type,
        })?;
        run_event(
            battle,
            EventKind::BattleStart,
            EventTarget::Battle,
            None,
            None,
            RelayValue::Absent,
        )?;
        Ok(())
    })
}

/// Queues a side's answer to its current request.
pub fn submit_choice(battle: &mut BattleState, choice: Choice) -> BattleResult<()> {
    let side = choice.side();
    let request = build_request(battle, side);
    choice.check_answers(&request)?;
    debug!(%side, ?choice, "choice queued");
    battle.action_queue[side.index()] = Some(choice);
    Ok(())
}

/// Whether every side that owes a choice has submitted one.
pub fn ready_for_turn_resolution(battle: &BattleState) -> bool {
    [SideId::P1, SideId::P2].into_iter().all(|side| {
        !build_request(battle, side).needs_choice() || battle.action_queue[side.index()].is_some()
    })
}

/// Resolves whatever the battle is waiting on with the queued choices.
pub fn advance(battle: &mut BattleState) -> BattleResult<EventBus> {
    match battle.game_state {
        GameState::TeamPreview => apply_team_preview(battle),
        GameState::WaitingForActions => resolve_turn(battle),
        GameState::WaitingForSwitches => apply_forced_switches(battle),
        state => Err(BattleStateError::WrongGameState(state).into()),
    }
}

/// Ends the battle with `side` forfeiting.
pub fn forfeit(battle: &mut BattleState, side: SideId) -> BattleResult<EventBus> {
    if battle.game_state.is_finished() {
        return Err(BattleStateError::WrongGameState(battle.game_state).into());
    }
    info!(%side, "side forfeited");
    battle.game_state = GameState::Aborted {
        forfeited: Some(side),
    };
    battle.action_queue = [None, None];
    let reason = format!("{} forfeited", battle.side(side).player_name);
    battle.log.push(BattleEvent::BattleAborted { reason });
    Ok(battle.drain_log())
}

/// Executes one complete turn from both sides' queued choices.
pub fn resolve_turn(battle: &mut BattleState) -> BattleResult<EventBus> {
    if battle.game_state != GameState::WaitingForActions {
        return Err(BattleStateError::WrongGameState(battle.game_state).into());
    }
    let choices = take_choices(battle)?;
    guarded(battle, |battle| run_turn(battle, choices))
}

/// Runs `phase`, returning the log it produced. Any error aborts the
/// battle; a half-resolved turn is never left behind as a live state.
fn guarded<F>(battle: &mut BattleState, phase: F) -> BattleResult<EventBus>
where
    F: FnOnce(&mut BattleState) -> BattleResult<()>,
{
    match phase(battle) {
        Ok(()) => Ok(battle.drain_log()),
        Err(e) => {
            error!(error = %e, turn = battle.turn_number, "aborting battle");
            battle.game_state = GameState::Aborted { forfeited: None };
            battle.active_move = None;
            battle.action_queue = [None, None];
            battle.log.push(BattleEvent::BattleAborted { reason: e.to_string() });
            Err(e)
        }
    }
}

fn take_choices(battle: &mut BattleState) -> BattleResult<Vec<Choice>> {
    for side in [SideId::P1, SideId::P2] {
        if build_request(battle, side).needs_choice() && battle.action_queue[side.index()].is_none() {
            return Err(BattleStateError::MissingChoice(side).into());
        }
    }
    Ok(battle.action_queue.iter_mut().filter_map(Option::take).collect())
}

fn apply_team_preview(battle: &mut BattleState) -> BattleResult<EventBus> {
    let choices = take_choices(battle)?;
    guarded(battle, |battle| {
        for choice in choices {
            let Choice::TeamPreview(preview) = choice else {
                continue;
            };
            let side = preview.side();
            let order: Vec<usize> = preview.order().iter().map(|p| p.index).collect();

            // The roster becomes the chosen team, in order.
            let mut roster: Vec<_> = std::mem::take(&mut battle.side_mut(side).roster)
                .into_iter()
                .map(Some)
                .collect();
            battle.side_mut(side).roster = order.iter().filter_map(|&i| roster[i].take()).collect();
            battle.log_event(BattleEvent::TeamOrderChosen { side, order })?;
        }

        for side in [SideId::P1, SideId::P2] {
            let slots = battle.game_type.active_slots().min(battle.side(side).roster.len());
            for slot in 0..slots {
                place(battle, side, slot, slot)?;
            }
        }
        each_event(battle, EventKind::SwitchIn)?;
        battle.game_state = GameState::WaitingForActions;
        Ok(())
    })
}

/// Puts a creature in a slot without firing its switch-in hooks, so all
/// leads are on the field before any of them react.
fn place(battle: &mut BattleState, side: SideId, slot: usize, index: usize) -> BattleResult<()> {
    let pokemon = PokemonRef::new(side, index);
    let Some(active) = battle.side_mut(side).active.get_mut(slot) else {
        return Err(BattleStateError::InvalidSlot { side, slot }.into());
    };
    *active = Some(index);
    battle
        .pokemon_mut(pokemon)
        .ok_or(BattleStateError::InvalidPokemonRef(pokemon))?
        .position = Some(slot);
    battle.log_event(BattleEvent::PokemonSwitchedIn { pokemon, slot })?;
    Ok(())
}

fn apply_forced_switches(battle: &mut BattleState) -> BattleResult<EventBus> {
    let choices = take_choices(battle)?;
    guarded(battle, |battle| {
        for choice in &choices {
            for slot_choice in choice.slot_choices() {
                if let SlotChoice::Switch(switch) = slot_choice {
                    switch_pokemon(battle, switch.out(), switch.into_pokemon(), switch.slot())?;
                }
            }
        }
        settle(battle);
        Ok(())
    })
}

fn run_turn(battle: &mut BattleState, choices: Vec<Choice>) -> BattleResult<()> {
    battle.game_state = GameState::TurnInProgress;
    battle.log_event(BattleEvent::TurnStarted {
        turn_number: battle.turn_number,
    })?;

    let mut stack = ActionStack::build_initial(battle, choices)?;
    terastallize(battle, &stack)?;
    each_event(battle, EventKind::BeforeTurn)?;

    while let Some(action) = stack.pop_front() {
        execute_battle_action(battle, action)?;
        if battle.check_battle_end().is_some() {
            break;
        }
    }

    if battle.check_battle_end().is_none() {
        field_event(battle)?;
    }

    battle.log_event(BattleEvent::TurnEnded)?;
    battle.turn_number += 1;
    settle(battle);
    Ok(())
}

/// Picks the next state from the board: finished, waiting on
/// replacements, or waiting on actions.
fn settle(battle: &mut BattleState) {
    if let Some(end) = battle.check_battle_end() {
        finish(battle, end);
    } else if battle
        .sides
        .iter()
        .any(|side| side.slots_needing_switch().iter().any(|needed| *needed))
    {
        battle.game_state = GameState::WaitingForSwitches;
    } else {
        battle.game_state = GameState::WaitingForActions;
    }
}

fn finish(battle: &mut BattleState, end: GameState) {
    for side in [SideId::P1, SideId::P2] {
        if battle.side(side).is_defeated() {
            battle.log.push(BattleEvent::PlayerDefeated { side });
        }
    }
    let winner = match end {
        GameState::Won(side) => Some(side),
        _ => None,
    };
    info!(?winner, turns = battle.turn_number, "battle ended");
    battle.log.push(BattleEvent::BattleEnded { winner });
    battle.game_state = end;
}

fn terastallize(battle: &mut BattleState, stack: &ActionStack) -> BattleResult<()> {
    let terastallizing: Vec<PokemonRef> = stack
        .iter()
        .filter_map(|action| match action {
            BattleAction::Move(choice) if choice.terastallize() => Some(choice.attacker()),
            _ => None,
        })
        .collect();

    for pokemon in terastallizing {
        if !can_terastallize(battle, pokemon) {
            continue;
        }
        let inst = battle
            .pokemon_mut(pokemon)
            .ok_or(BattleStateError::InvalidPokemonRef(pokemon))?;
        let Some(tera_type) = inst.tera_type else {
            continue;
        };
        inst.terastallized = true;
        battle.side_mut(pokemon.side).terastallized = true;
        battle.log_event(BattleEvent::Terastallized { pokemon, tera_type })?;
    }
    Ok(())
}

fn execute_battle_action(battle: &mut BattleState, action: BattleAction) -> BattleResult<()> {
    match action {
        BattleAction::Switch(choice) => {
            if !battle.is_on_field(choice.out()) {
                debug!(pokemon = %choice.out(), "switch skipped, no longer active");
                return Ok(());
            }
            switch_pokemon(battle, choice.out(), choice.into_pokemon(), choice.slot())
        }
        BattleAction::Move(choice) => use_move(battle, &choice),
    }
}

fn switch_pokemon(battle: &mut BattleState, out: PokemonRef, into: PokemonRef, slot: usize) -> BattleResult<()> {
    execute_command_batch(
        battle,
        vec![
            BattleCommand::SwitchOut { pokemon: out },
            BattleCommand::SwitchIn {
                side: into.side,
                slot,
                index: into.index,
            },
        ],
    )?;
    Ok(())
}

fn is_alive_on_field(battle: &BattleState, pokemon: PokemonRef) -> bool {
    battle.is_on_field(pokemon) && battle.pokemon(pokemon).is_some_and(|p| !p.is_fainted())
}

fn use_move(battle: &mut BattleState, choice: &MoveChoice) -> BattleResult<()> {
    let attacker = choice.attacker();
    if !is_alive_on_field(battle, attacker) {
        debug!(%attacker, "attacker can no longer act");
        return Ok(());
    }

    // A locking effect overrides the selection.
    let locked = priority_event(battle, EventKind::LockMove, attacker, None, RelayValue::Absent)?;
    let move_id = match locked.as_move() {
        Some(id) => id.clone(),
        None => {
            let out_of_pp = battle
                .pokemon(attacker)
                .and_then(|p| p.move_slot(choice.move_id()))
                .is_some_and(|slot| slot.pp == 0);
            if out_of_pp {
                return fail(battle, attacker, ActionFailureReason::NoPPRemaining);
            }
            choice.move_id().clone()
        }
    };
    let data = battle
        .moves
        .get(&move_id)
        .cloned()
        .ok_or_else(|| BattleStateError::UnknownMove(move_id.clone()))?;

    battle.active_move = Some(ActiveMove {
        id: move_id.clone(),
        user: attacker,
        source: None,
    });
    if let Some(effect) = &data.effect {
        let source = battle
            .catalog
            .instantiate(effect, EffectKind::ActiveMove)
            .map_err(BattleEngineError::from)?;
        battle.attach(Holder::ActiveMove(attacker), source);
    }

    let result = execute_move(battle, choice, attacker, &data);
    battle.active_move = None;
    result
}

fn fail(battle: &mut BattleState, pokemon: PokemonRef, reason: ActionFailureReason) -> BattleResult<()> {
    battle.log_event(BattleEvent::ActionFailed { pokemon, reason })?;
    Ok(())
}

fn execute_move(battle: &mut BattleState, choice: &MoveChoice, attacker: PokemonRef, data: &MoveData) -> BattleResult<()> {
    let effect_id = move_effect_id(&data.id);
    let source_effect = Some(&effect_id);

    let ready = run_event(battle, EventKind::BeforeMove, attacker, Some(attacker), source_effect, RelayValue::Bool(true))?;
    if !ready.passes() {
        return fail(battle, attacker, ActionFailureReason::Blocked);
    }

    if let Some(inst) = battle.pokemon_mut(attacker) {
        if let Some(slot) = inst.move_slot_mut(&data.id) {
            slot.pp = slot.pp.saturating_sub(1);
        }
        inst.last_move = Some(data.id.clone());
    }
    battle.log_event(BattleEvent::MoveUsed {
        pokemon: attacker,
        move_used: data.id.clone(),
    })?;

    let allowed = run_event(battle, EventKind::TryMove, attacker, Some(attacker), source_effect, RelayValue::Bool(true))?;
    if !allowed.passes() {
        return fail(battle, attacker, ActionFailureReason::Blocked);
    }

    let targets = resolve_targets(battle, choice, attacker, data)?;
    let (min_targets, _) = data.target.target_count();
    if targets.is_empty() && min_targets > 0 {
        return fail(battle, attacker, ActionFailureReason::NoTarget);
    }

    for target in targets {
        hit_target(battle, attacker, target, data, &effect_id)?;
        if battle.check_battle_end().is_some() {
            return Ok(());
        }
    }
    apply_field_inflict(battle, attacker, data)?;

    if data.id.is_struggle() {
        let recoil = battle.pokemon(attacker).map_or(1, |p| (p.max_hp() / 4).max(1));
        execute_command(
            battle,
            BattleCommand::DealDamage {
                target: attacker,
                amount: recoil,
                source: None,
                effect: Some(EffectId::from("recoil")),
            },
        )?;
    }

    if is_alive_on_field(battle, attacker) {
        run_event(battle, EventKind::AfterMove, attacker, Some(attacker), source_effect, RelayValue::Absent)?;
    }
    Ok(())
}

/// Works out who a move lands on at the moment it executes. A chosen foe
/// that has fainted is replaced by a random live adjacent foe; spread moves
/// hit whoever is there now.
fn resolve_targets(
    battle: &mut BattleState,
    choice: &MoveChoice,
    attacker: PokemonRef,
    data: &MoveData,
) -> BattleResult<Vec<PokemonRef>> {
    let category = data.target;
    let targets = match category {
        MoveTarget::Normal
        | MoveTarget::AdjacentFoe
        | MoveTarget::Any
        | MoveTarget::AdjacentAlly
        | MoveTarget::AdjacentAllyOrSelf
        | MoveTarget::User => {
            let chosen = match (category, choice.normal_target()) {
                (MoveTarget::Normal, Some(NormalTarget::Foe(slot))) => battle.occupant(attacker.side.foe(), slot),
                (MoveTarget::Normal, Some(NormalTarget::Ally(slot))) => battle.occupant(attacker.side, slot),
                _ => choice.possible_targets().first().copied(),
            };
            let target = match chosen {
                Some(target) if is_alive_on_field(battle, target) => Some(target),
                Some(target) if target.side != attacker.side => random_foe(battle, attacker, category),
                None if category == MoveTarget::User => Some(attacker),
                _ => None,
            };
            match target {
                Some(target) if matches!(category, MoveTarget::Normal | MoveTarget::AdjacentFoe | MoveTarget::Any) => {
                    vec![redirect(battle, attacker, target, data)?]
                }
                Some(target) => vec![target],
                None => Vec::new(),
            }
        }
        MoveTarget::AllAdjacentFoes | MoveTarget::AllAdjacent | MoveTarget::Allies => target_options(battle, attacker, category)
            .into_iter()
            .next()
            .map(|option| option.targets)
            .unwrap_or_default(),
        MoveTarget::RandomNormal | MoveTarget::Scripted => {
            random_foe(battle, attacker, MoveTarget::AllAdjacentFoes).into_iter().collect()
        }
        MoveTarget::Field | MoveTarget::AllySide | MoveTarget::FoeSide | MoveTarget::AllyTeam => Vec::new(),
    };
    debug!(%attacker, move_id = %data.id, ?targets, "targets resolved");
    Ok(targets)
}

fn random_foe(battle: &mut BattleState, attacker: PokemonRef, category: MoveTarget) -> Option<PokemonRef> {
    let foes: Vec<PokemonRef> = battle
        .active_alive()
        .into_iter()
        .filter(|p| p.side != attacker.side)
        .filter(|p| category == MoveTarget::Any || battle.is_adjacent(attacker, *p))
        .collect();
    if foes.is_empty() {
        return None;
    }
    let index = battle.rng.pick(foes.len(), "random target");
    foes.get(index).copied()
}

/// Offers single-target moves to redirection effects.
fn redirect(battle: &mut BattleState, attacker: PokemonRef, target: PokemonRef, data: &MoveData) -> BattleResult<PokemonRef> {
    let effect_id = move_effect_id(&data.id);
    let relay = run_event(
        battle,
        EventKind::RedirectTarget,
        attacker,
        Some(attacker),
        Some(&effect_id),
        RelayValue::Pokemon(target),
    )?;
    Ok(relay
        .as_pokemon()
        .filter(|p| is_alive_on_field(battle, *p))
        .unwrap_or(target))
}

fn hit_target(
    battle: &mut BattleState,
    attacker: PokemonRef,
    target: PokemonRef,
    data: &MoveData,
    effect_id: &EffectId,
) -> BattleResult<()> {
    if !is_alive_on_field(battle, target) {
        return Ok(());
    }
    let source_effect = Some(effect_id);
    let move_used = data.id.clone();

    if target != attacker {
        let gate = |battle: &mut BattleState, kind| {
            run_event(battle, kind, target, Some(attacker), source_effect, RelayValue::Bool(true))
                .map(|relay| relay.passes())
        };
        if !gate(battle, EventKind::TryHit)? {
            battle.log_event(BattleEvent::MoveBlocked {
                attacker,
                defender: target,
                move_used,
            })?;
            return Ok(());
        }
        if !gate(battle, EventKind::Invulnerability)? || !move_hits(battle, attacker, target, data)? {
            battle.log_event(BattleEvent::MoveMissed {
                attacker,
                defender: target,
                move_used,
            })?;
            return Ok(());
        }
        if !gate(battle, EventKind::Immunity)? {
            battle.log_event(BattleEvent::MoveHadNoEffect {
                attacker,
                defender: target,
                move_used,
            })?;
            return Ok(());
        }
    }

    if data.category != MoveCategory::Status {
        let damage = calculate_damage(battle, attacker, target, data, effect_id)?;
        let dealt = execute_command(
            battle,
            BattleCommand::DealDamage {
                target,
                amount: damage,
                source: Some(attacker),
                effect: Some(effect_id.clone()),
            },
        )?;
        if dealt {
            run_event(
                battle,
                EventKind::DamagingHit,
                target,
                Some(attacker),
                source_effect,
                RelayValue::Int(i32::from(damage)),
            )?;
        }
    }

    if let Some(inflict) = &data.inflicts {
        let command = match inflict.kind {
            EffectKind::Status => Some(BattleCommand::SetStatus {
                target,
                status: inflict.effect.clone(),
                source: Some(attacker),
                duration: inflict.duration,
            }),
            EffectKind::Volatile => Some(BattleCommand::AddVolatile {
                target,
                effect: inflict.effect.clone(),
                source: Some(attacker),
                duration: inflict.duration,
            }),
            _ => None,
        };
        if let Some(command) = command {
            if !execute_command(battle, command)? && data.category == MoveCategory::Status {
                fail(battle, attacker, ActionFailureReason::MoveFailedToExecute)?;
            }
        }
    }

    apply_secondaries(battle, attacker, target, data, effect_id)
}

/// Level-based damage with a random 85-100% spread, critical hits, STAB,
/// and every modifier hook along the way. There is no type chart; immunity
/// is left to `Immunity` handlers.
fn calculate_damage(
    battle: &mut BattleState,
    attacker: PokemonRef,
    target: PokemonRef,
    data: &MoveData,
    effect_id: &EffectId,
) -> BattleResult<u16> {
    let source_effect = Some(effect_id);
    let level = battle.pokemon(attacker).map_or(1, |p| u32::from(p.level));

    let base_power = i32::from(data.base_power);
    let base_power = run_event(battle, EventKind::BasePower, target, Some(attacker), source_effect, RelayValue::Int(base_power))?
        .as_int()
        .unwrap_or(base_power)
        .max(1) as u32;

    let crit_stage = run_event(battle, EventKind::ModifyCritRatio, attacker, Some(attacker), source_effect, RelayValue::Int(0))?
        .as_int()
        .unwrap_or(0);
    let crit_chance = match crit_stage {
        i32::MIN..=0 => 4,
        1 => 13,
        2 => 50,
        _ => 100,
    };
    let critical = battle.rng.next_outcome("critical hit") <= crit_chance;

    let attack = effective_attack(battle, attacker, target, data.category)?;
    let defense = effective_defense(battle, attacker, target, data.category)?.max(1);

    let mut damage = ((2 * level / 5 + 2) * base_power * attack / defense) / 50 + 2;
    if critical {
        damage = damage * 3 / 2;
        battle.log_event(BattleEvent::CriticalHit { target })?;
    }

    let roll = u32::from(battle.rng.next_outcome("damage roll"));
    damage = damage * (85 + roll.saturating_sub(1) * 16 / 100) / 100;

    if effective_types(battle, attacker)?.contains(&data.move_type) {
        let stab = run_event(battle, EventKind::ModifyStab, attacker, Some(attacker), source_effect, RelayValue::decimal(1.5))?
            .as_decimal()
            .unwrap_or(1.5);
        damage = (f64::from(damage) * stab).floor() as u32;
    }

    let damage = run_event(
        battle,
        EventKind::ModifyDamage,
        target,
        Some(attacker),
        source_effect,
        RelayValue::Int(damage.min(i32::MAX as u32) as i32),
    )?
    .as_int()
    .unwrap_or(1);

    debug!(%attacker, %target, damage, critical, "damage calculated");
    Ok(damage.clamp(1, i32::from(u16::MAX)) as u16)
}

fn apply_secondaries(
    battle: &mut BattleState,
    attacker: PokemonRef,
    target: PokemonRef,
    data: &MoveData,
    effect_id: &EffectId,
) -> BattleResult<()> {
    if data.secondaries.is_empty() {
        return Ok(());
    }
    let relay = run_event(
        battle,
        EventKind::ModifySecondaries,
        attacker,
        Some(attacker),
        Some(effect_id),
        RelayValue::Secondaries(data.secondaries.clone()),
    )?;
    let secondaries = relay
        .as_secondaries()
        .map_or_else(|| data.secondaries.clone(), <[_]>::to_vec);

    for secondary in secondaries {
        let recipient = if secondary.on_user { attacker } else { target };
        if !is_alive_on_field(battle, recipient) {
            continue;
        }
        if secondary.chance < 100 && battle.rng.next_outcome("secondary effect") > secondary.chance {
            continue;
        }

        let mut commands = Vec::new();
        if let Some(status) = secondary.status {
            commands.push(BattleCommand::SetStatus {
                target: recipient,
                status,
                source: Some(attacker),
                duration: None,
            });
        }
        if let Some(effect) = secondary.volatile {
            commands.push(BattleCommand::AddVolatile {
                target: recipient,
                effect,
                source: Some(attacker),
                duration: None,
            });
        }
        commands.extend(secondary.boosts.into_iter().map(|(stat, stages)| BattleCommand::Boost {
            target: recipient,
            stat,
            stages,
        }));
        execute_command_batch(battle, commands)?;
    }
    Ok(())
}

/// Conditions a move puts on a side, a slot or the field.
fn apply_field_inflict(battle: &mut BattleState, attacker: PokemonRef, data: &MoveData) -> BattleResult<()> {
    let Some(inflict) = &data.inflicts else {
        return Ok(());
    };
    let source = Some(attacker);
    let command = match inflict.kind {
        EffectKind::SideCondition => BattleCommand::AddSideCondition {
            side: if data.target == MoveTarget::FoeSide {
                attacker.side.foe()
            } else {
                attacker.side
            },
            condition: inflict.effect.clone(),
            source,
            duration: inflict.duration,
        },
        EffectKind::SlotCondition => {
            let Some(slot) = battle.slot_of(attacker) else {
                return Ok(());
            };
            BattleCommand::AddSlotCondition {
                side: attacker.side,
                slot,
                condition: inflict.effect.clone(),
                duration: inflict.duration,
            }
        }
        EffectKind::Weather => BattleCommand::SetWeather {
            weather: inflict.effect.clone(),
            source,
            duration: inflict.duration,
        },
        EffectKind::Terrain | EffectKind::PseudoWeather => BattleCommand::AddFieldEffect {
            effect: inflict.effect.clone(),
            kind: inflict.kind,
            source,
            duration: inflict.duration,
        },
        _ => return Ok(()),
    };
    if !execute_command(battle, command)? {
        fail(battle, attacker, ActionFailureReason::MoveFailedToExecute)?;
    }
    Ok(())
}

/// The source-effect id move events carry, so handlers can look the move
/// up by name.
pub fn move_effect_id(id: &MoveId) -> EffectId {
    EffectId::new(id.as_str())
}
