//! Validated player choices.
//!
//! Every choice type here can only be built through a constructor that
//! checks it against the current board, so holding one means it was legal
//! when it was made.

mod dual_slot;
mod move_choice;
mod switch;
mod team_preview;

pub use dual_slot::DualSlotChoice;
pub use move_choice::{can_terastallize, MoveChoice, NormalTarget};
pub use switch::SwitchChoice;
pub use team_preview::{team_preview_size, TeamPreviewChoice};

use crate::battle::state::BattleState;
use crate::decision::Request;
use crate::errors::{ChoiceError, ChoiceResult};
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use schema::{MoveTarget, SideId};
use serde::Serialize;
use tracing::debug;

/// What one active slot does this turn.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub enum SlotChoice {
    Move(MoveChoice),
    Switch(SwitchChoice),
    /// Nothing to do: an empty slot, or a slot that needs no replacement.
    Pass { side: SideId, slot: usize },
}

impl SlotChoice {
    pub fn side(&self) -> SideId {
        match self {
            SlotChoice::Move(choice) => choice.attacker().side,
            SlotChoice::Switch(choice) => choice.out().side,
            SlotChoice::Pass { side, .. } => *side,
        }
    }

    pub fn slot(&self) -> usize {
        match self {
            SlotChoice::Move(choice) => choice.slot(),
            SlotChoice::Switch(choice) => choice.slot(),
            SlotChoice::Pass { slot, .. } => *slot,
        }
    }
}

/// A side's full answer to one request.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Single(SlotChoice),
    Dual(DualSlotChoice),
    TeamPreview(TeamPreviewChoice),
}

impl Choice {
    pub fn side(&self) -> SideId {
        match self {
            Choice::Single(choice) => choice.side(),
            Choice::Dual(choice) => choice.side(),
            Choice::TeamPreview(choice) => choice.side(),
        }
    }

    /// The per-slot choices, in slot order. Empty for team preview.
    pub fn slot_choices(&self) -> Vec<&SlotChoice> {
        match self {
            Choice::Single(choice) => vec![choice],
            Choice::Dual(choice) => choice.slots().to_vec(),
            Choice::TeamPreview(_) => Vec::new(),
        }
    }

    /// Whether this choice answers `request`.
    pub fn check_answers(&self, request: &Request) -> ChoiceResult<()> {
        let moves_allowed = match request {
            Request::Move { .. } => true,
            Request::ForceSwitch { .. } => false,
            Request::TeamPreview { .. } => {
                return match self {
                    Choice::TeamPreview(_) => Ok(()),
                    _ => Err(ChoiceError::WrongRequest { expected: "team preview" }),
                };
            }
            Request::Wait { .. } => return Err(ChoiceError::WrongRequest { expected: "wait" }),
        };
        if matches!(self, Choice::TeamPreview(_)) {
            let expected = if moves_allowed { "move" } else { "switch" };
            return Err(ChoiceError::WrongRequest { expected });
        }
        if self.side() != request.side() {
            return Err(ChoiceError::SlotSideMismatch {
                expected: request.side(),
                found: self.side(),
            });
        }
        if !moves_allowed && self.slot_choices().iter().any(|c| matches!(c, SlotChoice::Move(_))) {
            return Err(ChoiceError::WrongRequest { expected: "switch" });
        }
        Ok(())
    }

    /// The choice a side makes when it has no say: leads in roster order,
    /// the first usable move at the first legal target (Struggle when none
    /// is usable), and the first healthy bench creature for each forced
    /// switch.
    pub fn default_for(request: &Request, battle: &BattleState) -> ChoiceResult<Choice> {
        let side = request.side();
        let slot_choices = match request {
            Request::TeamPreview { team_size, .. } => {
                let order = (0..battle.side(side).roster.len())
                    .map(|index| PokemonRef::new(side, index))
                    .filter(|p| battle.pokemon(*p).is_some_and(|inst| !inst.is_fainted()))
                    .take(*team_size)
                    .collect();
                return TeamPreviewChoice::new(battle, order).map(Choice::TeamPreview);
            }
            Request::Wait { .. } => return Err(ChoiceError::WrongRequest { expected: "wait" }),
            Request::Move { .. } => (0..battle.game_type.active_slots())
                .map(|slot| default_move(battle, side, slot))
                .collect::<ChoiceResult<Vec<_>>>()?,
            Request::ForceSwitch { force_switch, .. } => {
                let mut bench = battle.side(side).switch_candidates().into_iter();
                force_switch
                    .iter()
                    .enumerate()
                    .map(|(slot, &needed)| {
                        let out = battle.occupant(side, slot);
                        let incoming = if needed { bench.next() } else { None };
                        match (out, incoming) {
                            (Some(out), Some(index)) => {
                                SwitchChoice::new(battle, out, PokemonRef::new(side, index)).map(SlotChoice::Switch)
                            }
                            _ => Ok(SlotChoice::Pass { side, slot }),
                        }
                    })
                    .collect::<ChoiceResult<Vec<_>>>()?
            }
        };
        debug!(%side, slots = slot_choices.len(), "default choice");
        Choice::from_slots(battle, side, slot_choices)
    }

    /// Wraps slot choices as `Single` or `Dual` to fit the format.
    pub fn from_slots(battle: &BattleState, side: SideId, mut slots: Vec<SlotChoice>) -> ChoiceResult<Choice> {
        if battle.game_type.is_multi_active() {
            let second = slots.pop().unwrap_or(SlotChoice::Pass { side, slot: 1 });
            let first = slots.pop().unwrap_or(SlotChoice::Pass { side, slot: 0 });
            DualSlotChoice::new(battle, side, first, second).map(Choice::Dual)
        } else {
            Ok(Choice::Single(slots.pop().unwrap_or(SlotChoice::Pass { side, slot: 0 })))
        }
    }
}

fn default_move(battle: &BattleState, side: SideId, slot: usize) -> ChoiceResult<SlotChoice> {
    let pass = SlotChoice::Pass { side, slot };
    let Some(attacker) = battle.occupant(side, slot) else {
        return Ok(pass);
    };
    let Some(pokemon) = battle.pokemon(attacker).filter(|p| !p.is_fainted()) else {
        return Ok(pass);
    };

    let move_id = pokemon
        .moves
        .iter()
        .find(|slot| slot.usable())
        .map_or_else(MoveId::struggle, |slot| slot.id.clone());
    let Some(target) = battle.moves.get(&move_id).map(|data| data.target) else {
        return Ok(pass);
    };
    match target_options(battle, attacker, target).into_iter().next() {
        Some(option) => MoveChoice::new(
            battle,
            attacker,
            move_id,
            false,
            option.normal_target,
            option.targets,
        )
        .map(SlotChoice::Move),
        None => Ok(pass),
    }
}

/// One legal way to aim a move.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TargetOption {
    pub normal_target: Option<NormalTarget>,
    pub targets: Vec<PokemonRef>,
}

/// Every legal way `attacker` could aim a move of this category right now.
/// Each option passes [`MoveChoice::new`]'s target checks.
pub fn target_options(battle: &BattleState, attacker: PokemonRef, category: MoveTarget) -> Vec<TargetOption> {
    let others: Vec<PokemonRef> = battle
        .active_alive()
        .into_iter()
        .filter(|p| *p != attacker)
        .collect();
    let adjacent = |p: &&PokemonRef| battle.is_adjacent(attacker, **p);
    let foe = |p: &&PokemonRef| p.side != attacker.side;
    let ally = |p: &&PokemonRef| p.side == attacker.side;

    let single = |targets: Vec<PokemonRef>| {
        targets
            .into_iter()
            .map(|p| TargetOption {
                normal_target: None,
                targets: vec![p],
            })
            .collect::<Vec<_>>()
    };
    let group = |targets: Vec<PokemonRef>| {
        if targets.is_empty() {
            Vec::new()
        } else {
            vec![TargetOption {
                normal_target: None,
                targets,
            }]
        }
    };

    match category {
        MoveTarget::Normal => others
            .iter()
            .filter(adjacent)
            .filter_map(|p| {
                let slot = battle.slot_of(*p)?;
                let normal = if p.side == attacker.side {
                    NormalTarget::Ally(slot)
                } else {
                    NormalTarget::Foe(slot)
                };
                Some(TargetOption {
                    normal_target: Some(normal),
                    targets: vec![*p],
                })
            })
            .collect(),
        MoveTarget::User => single(vec![attacker]),
        MoveTarget::AdjacentAlly => single(others.iter().filter(ally).filter(adjacent).copied().collect()),
        MoveTarget::AdjacentAllyOrSelf => {
            let mut targets = vec![attacker];
            targets.extend(others.iter().filter(ally).filter(adjacent).copied());
            single(targets)
        }
        MoveTarget::AdjacentFoe => single(others.iter().filter(foe).filter(adjacent).copied().collect()),
        MoveTarget::Any => single(others),
        MoveTarget::AllAdjacentFoes | MoveTarget::RandomNormal => {
            group(others.iter().filter(foe).filter(adjacent).copied().collect())
        }
        MoveTarget::AllAdjacent => group(others.iter().filter(adjacent).copied().collect()),
        MoveTarget::Allies => {
            let mut targets = vec![attacker];
            targets.extend(others.iter().filter(ally).copied());
            group(targets)
        }
        MoveTarget::Field
        | MoveTarget::AllySide
        | MoveTarget::FoeSide
        | MoveTarget::AllyTeam
        | MoveTarget::Scripted => vec![TargetOption {
            normal_target: None,
            targets: Vec::new(),
        }],
    }
}
