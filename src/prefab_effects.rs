//! A small built-in effect catalog: the statuses, conditions, abilities and
//! items the demo battle and the test suite use.

use crate::battle::commands::{execute_command, BattleCommand};
use crate::battle::state::{BattleEvent, BattleState};
use crate::effects::{EffectId, EffectRegistry};
use crate::errors::{DescriptorResult, DispatchResult};
use crate::events::{
    Callback, EventContext, EventKind, HandlerDescriptor, HandlerTable, Holder, RelayKinds, RelayValue, Scope,
    Signature,
};
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use schema::{MoveCategory, PokemonType, SideId, StatType};

/// Builds the catalog with every prefab effect registered.
pub fn standard_catalog() -> DescriptorResult<EffectRegistry> {
    let mut registry = EffectRegistry::new();
    registry
        .register("brn", burn()?)
        .register("par", paralysis()?)
        .register("psn", poison()?)
        .register("slp", sleep()?)
        .register("confusion", confusion()?)
        .register("flinch", flinch()?)
        .register("protect", protect()?)
        .register("lockedmove", locked_move()?)
        .register("helpinghand", helping_hand()?)
        .register("raindance", rain()?)
        .register("sandstorm", sandstorm()?)
        .register("trickroom", trick_room()?)
        .register("reflect", reflect()?)
        .register("safeguard", safeguard()?)
        .register("tailwind", tailwind()?)
        .register("spikes", spikes()?)
        .register("wish", wish()?)
        .register("intimidate", intimidate()?)
        .register("levitate", levitate()?)
        .register("lightningrod", lightning_rod()?)
        .register("serenegrace", serene_grace()?)
        .register("prankster", prankster()?)
        .register("leftovers", leftovers()?)
        .register("choicescarf", choice_scarf()?)
        .register("lifeorb", life_orb()?)
        .register("healbell", heal_bell()?)
        .register("outrage", outrage()?)
        .register("sleepclause", sleep_clause()?);
    Ok(registry)
}

// --- Helpers ---

fn fraction_of_max_hp(battle: &BattleState, pokemon: PokemonRef, divisor: u16) -> u16 {
    battle.pokemon(pokemon).map_or(1, |p| (p.max_hp() / divisor).max(1))
}

/// Type and category of the move a firing is about, when it is about one.
fn move_traits(battle: &BattleState, ctx: &EventContext<'_>) -> Option<(PokemonType, MoveCategory)> {
    let id = ctx.source_effect.map(|effect| MoveId::new(effect.as_str()))?;
    battle.moves.get(&id).map(|data| (data.move_type, data.category))
}

fn holder_side(ctx: &EventContext<'_>) -> Option<SideId> {
    match ctx.holder {
        Holder::Side(side) | Holder::Slot { side, .. } => Some(side),
        Holder::Pokemon(pokemon) | Holder::ActiveMove(pokemon) => Some(pokemon.side),
        Holder::Field | Holder::Format => None,
    }
}

fn announce(battle: &mut BattleState, ctx: &EventContext<'_>) -> DispatchResult<()> {
    battle.log_event(BattleEvent::EffectActivated {
        holder: ctx.holder,
        effect: ctx.effect.clone(),
    })
}

fn damage(battle: &mut BattleState, ctx: &EventContext<'_>, target: PokemonRef, divisor: u16) -> DispatchResult<bool> {
    let amount = fraction_of_max_hp(battle, target, divisor);
    execute_command(
        battle,
        BattleCommand::DealDamage {
            target,
            amount,
            source: None,
            effect: Some(ctx.effect.clone()),
        },
    )
}

fn counter(battle: &BattleState, ctx: &EventContext<'_>) -> i32 {
    battle
        .find_source(ctx.holder, ctx.effect_order)
        .map_or(0, |source| source.state.counter)
}

fn set_counter(battle: &mut BattleState, ctx: &EventContext<'_>, value: i32) {
    if let Some(source) = battle.find_source_mut(ctx.holder, ctx.effect_order) {
        source.state.counter = value;
    }
}

// --- Statuses ---

fn burn() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::Residual,
            Callback::action(|battle, ctx| {
                damage(battle, ctx, ctx.target_pokemon()?, 16)?;
                Ok(())
            }),
        ))?
        .with(HandlerDescriptor::on(
            EventKind::ModifyAtk,
            Callback::integer(|_, _, attack| Ok(Some(attack / 2))),
        ))
}

fn paralysis() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::ModifySpe,
            Callback::integer(|_, _, speed| Ok(Some(speed / 2))),
        ))?
        .with(HandlerDescriptor::on(
            EventKind::BeforeMove,
            Callback::gate(|battle, ctx| {
                if battle.rng.next_outcome("full paralysis") <= 25 {
                    announce(battle, ctx)?;
                    return Ok(Some(false));
                }
                Ok(None)
            }),
        ))
}

fn poison() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::Residual,
        Callback::action(|battle, ctx| {
            damage(battle, ctx, ctx.target_pokemon()?, 8)?;
            Ok(())
        }),
    ))
}

/// Sleeps one to three of the holder's own turns, then wakes up on the
/// next attempt to move.
fn sleep() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::Start,
            Callback::gate(|battle, ctx| {
                let turns = 1 + battle.rng.pick(3, "sleep turns") as i32;
                set_counter(battle, ctx, turns);
                Ok(None)
            }),
        ))?
        .with(HandlerDescriptor::on(
            EventKind::BeforeMove,
            Callback::gate(|battle, ctx| {
                let left = counter(battle, ctx);
                if left > 0 {
                    set_counter(battle, ctx, left - 1);
                    announce(battle, ctx)?;
                    return Ok(Some(false));
                }
                let target = ctx.target_pokemon()?;
                execute_command(battle, BattleCommand::CureStatus { target })?;
                Ok(None)
            }),
        ))
}

// --- Volatiles ---

fn confusion() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::Start,
            Callback::gate(|battle, ctx| {
                let turns = 2 + battle.rng.pick(4, "confusion turns") as u8;
                if let Some(source) = battle.find_source_mut(ctx.holder, ctx.effect_order) {
                    source.state.duration.get_or_insert(turns);
                }
                Ok(None)
            }),
        ))?
        .with(HandlerDescriptor::on(
            EventKind::BeforeMove,
            Callback::gate(|battle, ctx| {
                if battle.rng.next_outcome("confusion self-hit") > 33 {
                    return Ok(None);
                }
                announce(battle, ctx)?;
                damage(battle, ctx, ctx.target_pokemon()?, 8)?;
                Ok(Some(false))
            }),
        ))
}

/// Lasts until the end of the turn it was inflicted.
fn flinch() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::Start,
            Callback::gate(|battle, ctx| {
                if let Some(source) = battle.find_source_mut(ctx.holder, ctx.effect_order) {
                    source.state.duration = Some(1);
                }
                Ok(None)
            }),
        ))?
        .with(HandlerDescriptor::on(
            EventKind::BeforeMove,
            Callback::gate(|battle, ctx| {
                announce(battle, ctx)?;
                Ok(Some(false))
            }),
        ))
}

fn protect() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::TryHit,
        Callback::gate(|battle, ctx| {
            announce(battle, ctx)?;
            Ok(Some(false))
        }),
    ))
}

/// Forces the last move again; confuses the holder when it runs out.
fn locked_move() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(HandlerDescriptor::on(
            EventKind::LockMove,
            Callback::raw(Signature::new(None, RelayKinds::ABSENT | RelayKinds::MOVE), |battle, ctx| {
                let target = ctx.target_pokemon()?;
                Ok(battle
                    .pokemon(target)
                    .and_then(|p| p.last_move.clone())
                    .map_or(RelayValue::Absent, RelayValue::Move))
            }),
        ))?
        .with(HandlerDescriptor::on(
            EventKind::End,
            Callback::action(|battle, ctx| {
                let target = ctx.target_pokemon()?;
                execute_command(
                    battle,
                    BattleCommand::AddVolatile {
                        target,
                        effect: EffectId::from("confusion"),
                        source: None,
                        duration: None,
                    },
                )?;
                Ok(())
            }),
        ))
}

fn helping_hand() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(
        HandlerDescriptor::on(
            EventKind::BasePower,
            Callback::integer(|_, _, power| Ok(Some(power * 3 / 2))),
        )
        .scope(Scope::Source),
    )
}

// --- Field ---

fn rain() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::ModifyDamage,
        Callback::integer(|battle, ctx, damage| {
            Ok(match move_traits(battle, ctx) {
                Some((PokemonType::Water, _)) => Some(damage * 3 / 2),
                Some((PokemonType::Fire, _)) => Some(damage / 2),
                _ => None,
            })
        }),
    ))
}

fn sandstorm() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::FieldResidual,
        Callback::action(|battle, ctx| {
            for pokemon in battle.active_alive() {
                let sheltered = battle.pokemon(pokemon).is_some_and(|p| {
                    p.types
                        .iter()
                        .any(|t| matches!(t, PokemonType::Rock | PokemonType::Ground | PokemonType::Steel))
                });
                if !sheltered {
                    damage(battle, ctx, pokemon, 16)?;
                }
            }
            Ok(())
        }),
    ))
}

/// Slower creatures act first while it lasts.
fn trick_room() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(
        HandlerDescriptor::on(
            EventKind::ModifySpe,
            Callback::integer(|_, _, speed| Ok(Some(10_000 - speed))),
        )
        .order(100),
    )
}

// --- Side and slot conditions ---

fn reflect() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::ModifyDamage,
        Callback::integer(|battle, ctx, damage| {
            let from_foe = ctx.source.map(|s| s.side) != holder_side(ctx);
            let physical = matches!(move_traits(battle, ctx), Some((_, MoveCategory::Physical)));
            Ok((from_foe && physical).then_some(damage / 2))
        }),
    ))
}

fn safeguard() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::SetStatus,
        Callback::gate(|battle, ctx| {
            let from_foe = ctx.source.is_some_and(|s| Some(s.side) != holder_side(ctx));
            if from_foe {
                announce(battle, ctx)?;
                return Ok(Some(false));
            }
            Ok(None)
        }),
    ))
}

fn tailwind() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::ModifySpe,
        Callback::integer(|_, _, speed| Ok(Some(speed * 2))),
    ))
}

fn spikes() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::SwitchIn,
        Callback::action(|battle, ctx| {
            damage(battle, ctx, ctx.target_pokemon()?, 8)?;
            Ok(())
        }),
    ))
}

/// Heals whoever holds the slot when it comes true.
fn wish() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::End,
        Callback::action(|battle, ctx| {
            let target = ctx.target_pokemon()?;
            let amount = fraction_of_max_hp(battle, target, 2);
            execute_command(
                battle,
                BattleCommand::Heal {
                    target,
                    amount,
                    effect: Some(ctx.effect.clone()),
                },
            )?;
            Ok(())
        }),
    ))
}

// --- Abilities ---

fn intimidate() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::SwitchIn,
        Callback::action(|battle, ctx| {
            let user = ctx.target_pokemon()?;
            let foes: Vec<PokemonRef> = battle
                .active_alive()
                .into_iter()
                .filter(|p| p.side != user.side && battle.is_adjacent(user, *p))
                .collect();
            announce(battle, ctx)?;
            for target in foes {
                execute_command(
                    battle,
                    BattleCommand::Boost {
                        target,
                        stat: StatType::Attack,
                        stages: -1,
                    },
                )?;
            }
            Ok(())
        }),
    ))
}

fn levitate() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::Immunity,
        Callback::gate(|battle, ctx| {
            Ok(matches!(move_traits(battle, ctx), Some((PokemonType::Ground, _))).then_some(false))
        }),
    ))
}

/// Draws in foes' single-target Electric moves and absorbs them.
fn lightning_rod() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(
            HandlerDescriptor::on(
                EventKind::RedirectTarget,
                Callback::redirect(|battle, ctx, current| {
                    let Some(holder) = ctx.holder_pokemon() else {
                        return Ok(None);
                    };
                    let electric = matches!(move_traits(battle, ctx), Some((PokemonType::Electric, _)));
                    if electric && current != holder && battle.is_on_field(holder) {
                        return Ok(Some(holder));
                    }
                    Ok(None)
                }),
            )
            .scope(Scope::Foe),
        )?
        .with(HandlerDescriptor::on(
            EventKind::Immunity,
            Callback::gate(|battle, ctx| {
                if !matches!(move_traits(battle, ctx), Some((PokemonType::Electric, _))) {
                    return Ok(None);
                }
                let target = ctx.target_pokemon()?;
                announce(battle, ctx)?;
                execute_command(
                    battle,
                    BattleCommand::Boost {
                        target,
                        stat: StatType::SpecialAttack,
                        stages: 1,
                    },
                )?;
                Ok(Some(false))
            }),
        ))
}

fn serene_grace() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::ModifySecondaries,
        Callback::secondaries(|_, _, secondaries| {
            Ok(Some(
                secondaries
                    .iter()
                    .cloned()
                    .map(|mut secondary| {
                        secondary.chance = secondary.chance.saturating_mul(2).min(100);
                        secondary
                    })
                    .collect(),
            ))
        }),
    ))
}

fn prankster() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::ModifyPriority,
        Callback::integer(|battle, ctx, priority| {
            let status = matches!(move_traits(battle, ctx), Some((_, MoveCategory::Status)));
            Ok(status.then_some(priority + 1))
        }),
    ))
}

// --- Items ---

fn leftovers() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::Residual,
        Callback::action(|battle, ctx| {
            let target = ctx.target_pokemon()?;
            let amount = fraction_of_max_hp(battle, target, 16);
            execute_command(
                battle,
                BattleCommand::Heal {
                    target,
                    amount,
                    effect: Some(ctx.effect.clone()),
                },
            )?;
            Ok(())
        }),
    ))
}

fn choice_scarf() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::ModifySpe,
        Callback::integer(|_, _, speed| Ok(Some(speed * 3 / 2))),
    ))
}

fn life_orb() -> DescriptorResult<HandlerTable> {
    HandlerTable::new()
        .with(
            HandlerDescriptor::on(
                EventKind::ModifyDamage,
                Callback::integer(|_, _, damage| Ok(Some(damage * 13 / 10))),
            )
            .scope(Scope::Source),
        )?
        .with(HandlerDescriptor::on(
            EventKind::AfterMove,
            Callback::action(|battle, ctx| {
                let damaging = matches!(move_traits(battle, ctx), Some((_, MoveCategory::Physical | MoveCategory::Special)));
                if damaging {
                    damage(battle, ctx, ctx.target_pokemon()?, 10)?;
                }
                Ok(())
            }),
        ))
}

// --- Move effects ---

/// Cures every creature on the user's side, benched ones included.
fn heal_bell() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::AfterMove,
        Callback::action(|battle, ctx| {
            let user = ctx.target_pokemon()?;
            for index in 0..battle.side(user.side).roster.len() {
                let target = PokemonRef::new(user.side, index);
                execute_command(battle, BattleCommand::CureStatus { target })?;
            }
            Ok(())
        }),
    ))
}

fn outrage() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::AfterMove,
        Callback::action(|battle, ctx| {
            let user = ctx.target_pokemon()?;
            let locked = EffectId::from("lockedmove");
            if battle.pokemon(user).is_some_and(|p| !p.has_volatile(&locked)) {
                execute_command(
                    battle,
                    BattleCommand::AddVolatile {
                        target: user,
                        effect: locked,
                        source: Some(user),
                        duration: Some(3),
                    },
                )?;
            }
            Ok(())
        }),
    ))
}

// --- Format rules ---

/// A side may only have one creature put to sleep at a time.
fn sleep_clause() -> DescriptorResult<HandlerTable> {
    HandlerTable::new().with(HandlerDescriptor::on(
        EventKind::SetStatus,
        Callback::gate(|battle, ctx| {
            let slp = EffectId::from("slp");
            if ctx.relay_effect()? != &slp {
                return Ok(None);
            }
            let target = ctx.target_pokemon()?;
            let already = battle
                .side(target.side)
                .roster
                .iter()
                .any(|p| !p.is_fainted() && p.has_status(&slp));
            Ok(already.then_some(false))
        }),
    ))
}
