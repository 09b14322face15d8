//! Built-in decision sources for computer-controlled sides.

use crate::battle::state::BattleState;
use crate::choices::{target_options, Choice, MoveChoice, SlotChoice, SwitchChoice, TargetOption};
use crate::decision::{DecisionSource, Request};
use crate::errors::DecisionError;
use crate::moves::{MoveData, MoveId};
use crate::pokemon::PokemonRef;
use async_trait::async_trait;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use schema::{MoveCategory, SideId};
use std::sync::Mutex;
use tracing::debug;

fn rejected(side: SideId, reason: impl ToString) -> DecisionError {
    DecisionError::SourceFailed {
        side,
        reason: reason.to_string(),
    }
}

/// Always answers with the default choice: first usable move at the first
/// legal target, first healthy bench creature for replacements.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstLegalPlayer;

#[async_trait]
impl DecisionSource for FirstLegalPlayer {
    async fn choose(&self, request: &Request, battle: &BattleState) -> Result<Choice, DecisionError> {
        Choice::default_for(request, battle).map_err(|e| rejected(request.side(), e))
    }
}

/// Picks uniformly among usable moves and their legal aims.
#[derive(Debug)]
pub struct RandomPlayer {
    rng: Mutex<StdRng>,
}

impl RandomPlayer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick_slot(&self, battle: &BattleState, side: SideId, slot: usize, rng: &mut StdRng) -> Result<SlotChoice, DecisionError> {
        let pass = SlotChoice::Pass { side, slot };
        let Some(attacker) = battle.occupant(side, slot) else {
            return Ok(pass);
        };
        let Some(user) = battle.pokemon(attacker).filter(|p| !p.is_fainted()) else {
            return Ok(pass);
        };

        let usable: Vec<&MoveId> = user.moves.iter().filter(|m| m.usable()).map(|m| &m.id).collect();
        let struggle = MoveId::struggle();
        let move_id = usable.choose(rng).copied().unwrap_or(&struggle).clone();
        let Some(data) = battle.moves.get(&move_id) else {
            return Ok(pass);
        };
        let options = target_options(battle, attacker, data.target);
        let Some(option) = options.choose(rng).cloned() else {
            return Ok(pass);
        };
        let terastallize = crate::choices::can_terastallize(battle, attacker) && rng.random_bool(0.25);
        MoveChoice::new(battle, attacker, move_id, terastallize, option.normal_target, option.targets)
            .map(SlotChoice::Move)
            .map_err(|e| rejected(side, e))
    }

    fn pick(&self, request: &Request, battle: &BattleState) -> Result<Choice, DecisionError> {
        let side = request.side();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let slots = match request {
            Request::Move { .. } => {
                let mut slots = Vec::new();
                for slot in 0..battle.game_type.active_slots() {
                    slots.push(self.pick_slot(battle, side, slot, &mut rng)?);
                }
                slots
            }
            Request::ForceSwitch { force_switch, .. } => {
                let mut bench = battle.side(side).switch_candidates();
                force_switch
                    .iter()
                    .enumerate()
                    .map(|(slot, &needed)| {
                        let incoming = if needed && !bench.is_empty() {
                            let at = rng.random_range(0..bench.len());
                            Some(bench.remove(at))
                        } else {
                            None
                        };
                        match (battle.occupant(side, slot), incoming) {
                            (Some(out), Some(index)) => SwitchChoice::new(battle, out, PokemonRef::new(side, index))
                                .map(SlotChoice::Switch)
                                .map_err(|e| rejected(side, e)),
                            _ => Ok(SlotChoice::Pass { side, slot }),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            Request::TeamPreview { .. } | Request::Wait { .. } => {
                return Choice::default_for(request, battle).map_err(|e| rejected(side, e));
            }
        };
        Choice::from_slots(battle, side, slots).map_err(|e| rejected(side, e))
    }
}

impl Default for RandomPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionSource for RandomPlayer {
    async fn choose(&self, request: &Request, battle: &BattleState) -> Result<Choice, DecisionError> {
        self.pick(request, battle)
    }
}

/// Scores every legal move and target, and picks the best.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringPlayer;

impl ScoringPlayer {
    pub fn new() -> Self {
        Self
    }

    /// Raw power, boosted by STAB, scaled by accuracy; plus a bonus for
    /// conditions the targets do not have yet.
    fn score_move(&self, battle: &BattleState, attacker: PokemonRef, data: &MoveData, option: &TargetOption) -> f32 {
        let Some(user) = battle.pokemon(attacker) else {
            return -1.0;
        };
        let healthy_targets = option
            .targets
            .iter()
            .filter(|t| battle.pokemon(**t).is_some_and(|p| p.status.is_none()))
            .count() as f32;
        let foes = option.targets.iter().filter(|t| t.side != attacker.side).count() as f32;
        let allies_hit = option.targets.iter().any(|t| t.side == attacker.side && *t != attacker);

        let mut damage_score = 0.0;
        if data.category != MoveCategory::Status {
            let user_types = match (user.terastallized, user.tera_type) {
                (true, Some(tera)) => vec![tera],
                _ => user.types.clone(),
            };
            let stab = if user_types.contains(&data.move_type) { 1.5 } else { 1.0 };
            damage_score = f32::from(data.base_power) * stab * foes.max(1.0);
            // Spread moves that also hit partners are worth less.
            if allies_hit {
                damage_score *= 0.5;
            }
        }

        let mut utility_score = 0.0;
        if let Some(inflict) = &data.inflicts {
            utility_score += match inflict.kind {
                crate::effects::EffectKind::Status => 45.0 * healthy_targets,
                crate::effects::EffectKind::Volatile => 25.0,
                _ => 30.0,
            };
        }
        for secondary in &data.secondaries {
            let weight = if secondary.status.is_some() { 45.0 } else { 15.0 };
            utility_score += weight * f32::from(secondary.chance) / 100.0;
        }

        if data.category == MoveCategory::Status && utility_score < 1.0 {
            return -1.0;
        }
        let mut score = damage_score + utility_score;
        if data.category != MoveCategory::Status {
            let accuracy = data.accuracy.unwrap_or(101);
            score *= f32::from(accuracy) / 100.0;
        }

        // +/- 5% so equal options do not always resolve the same way.
        score * (1.0 + (rand::random::<f32>() * 0.1 - 0.05))
    }

    fn best_slot_choice(&self, battle: &BattleState, side: SideId, slot: usize) -> Result<SlotChoice, DecisionError> {
        let pass = SlotChoice::Pass { side, slot };
        let Some(attacker) = battle.occupant(side, slot) else {
            return Ok(pass);
        };
        let Some(user) = battle.pokemon(attacker).filter(|p| !p.is_fainted()) else {
            return Ok(pass);
        };

        let mut usable: Vec<MoveId> = user.moves.iter().filter(|m| m.usable()).map(|m| m.id.clone()).collect();
        if usable.is_empty() {
            usable.push(MoveId::struggle());
        }

        let best = usable
            .iter()
            .filter_map(|id| battle.moves.get(id))
            .flat_map(|data| {
                target_options(battle, attacker, data.target)
                    .into_iter()
                    .map(move |option| (data, option))
            })
            .map(|(data, option)| {
                let score = self.score_move(battle, attacker, data, &option);
                (data.id.clone(), option, score)
            })
            .max_by_key(|(.., score)| OrderedFloat(*score));

        let Some((move_id, option, score)) = best else {
            return Ok(pass);
        };
        debug!(%attacker, %move_id, score, "scored best move");
        MoveChoice::new(battle, attacker, move_id, false, option.normal_target, option.targets)
            .map(SlotChoice::Move)
            .map_err(|e| rejected(side, e))
    }

    /// Sends in the healthiest creatures, by remaining HP fraction.
    fn replacements(&self, battle: &BattleState, side: SideId, force_switch: &[bool]) -> Result<Vec<SlotChoice>, DecisionError> {
        let mut bench: Vec<usize> = battle.side(side).switch_candidates();
        bench.sort_by_key(|index| {
            let fraction = battle
                .side(side)
                .pokemon(*index)
                .map_or(0.0, |p| f32::from(p.current_hp) / f32::from(p.max_hp().max(1)));
            std::cmp::Reverse(OrderedFloat(fraction))
        });
        let mut bench = bench.into_iter();

        force_switch
            .iter()
            .enumerate()
            .map(|(slot, &needed)| {
                let incoming = if needed { bench.next() } else { None };
                match (battle.occupant(side, slot), incoming) {
                    (Some(out), Some(index)) => SwitchChoice::new(battle, out, PokemonRef::new(side, index))
                        .map(SlotChoice::Switch)
                        .map_err(|e| rejected(side, e)),
                    _ => Ok(SlotChoice::Pass { side, slot }),
                }
            })
            .collect()
    }
}

#[async_trait]
impl DecisionSource for ScoringPlayer {
    async fn choose(&self, request: &Request, battle: &BattleState) -> Result<Choice, DecisionError> {
        let side = request.side();
        let slots = match request {
            Request::Move { .. } => (0..battle.game_type.active_slots())
                .map(|slot| self.best_slot_choice(battle, side, slot))
                .collect::<Result<Vec<_>, _>>()?,
            Request::ForceSwitch { force_switch, .. } => self.replacements(battle, side, force_switch)?,
            Request::TeamPreview { .. } | Request::Wait { .. } => {
                return Choice::default_for(request, battle).map_err(|e| rejected(side, e));
            }
        };
        Choice::from_slots(battle, side, slots).map_err(|e| rejected(side, e))
    }
}
