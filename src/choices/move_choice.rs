use crate::battle::state::BattleState;
use crate::errors::{ChoiceError, ChoiceResult};
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use schema::MoveTarget;
use serde::Serialize;

/// Which slot a Normal-target move is aimed at, relative to the user.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalTarget {
    Foe(usize),
    Ally(usize),
}

/// A move selection that has passed every board check.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveChoice {
    attacker: PokemonRef,
    slot: usize,
    move_id: MoveId,
    terastallize: bool,
    normal_target: Option<NormalTarget>,
    possible_targets: Vec<PokemonRef>,
}

impl MoveChoice {
    pub fn new(
        battle: &BattleState,
        attacker: PokemonRef,
        move_id: MoveId,
        terastallize: bool,
        normal_target: Option<NormalTarget>,
        possible_targets: Vec<PokemonRef>,
    ) -> ChoiceResult<Self> {
        let pokemon = battle
            .pokemon(attacker)
            .ok_or(ChoiceError::UnknownCreature(attacker))?;

        let unknown = || ChoiceError::UnknownMove {
            attacker,
            move_id: move_id.clone(),
        };
        let data = battle.moves.get(&move_id).ok_or_else(unknown)?;
        if !move_id.is_struggle() && !pokemon.knows_move(&move_id) {
            return Err(unknown());
        }
        if pokemon.is_fainted() {
            return Err(ChoiceError::AttackerFainted(attacker));
        }
        let slot = battle
            .slot_of(attacker)
            .ok_or(ChoiceError::AttackerNotActive(attacker))?;

        if let Some(move_slot) = pokemon.move_slot(&move_id) {
            if move_slot.pp == 0 {
                return Err(ChoiceError::NoPpLeft {
                    attacker,
                    move_id: move_id.clone(),
                });
            }
            if move_slot.disabled {
                return Err(ChoiceError::MoveDisabled {
                    attacker,
                    move_id: move_id.clone(),
                });
            }
        }

        if terastallize && !can_terastallize(battle, attacker) {
            return Err(ChoiceError::TerastallizeUnavailable(attacker));
        }

        let category = data.target;
        match (category, normal_target) {
            (MoveTarget::Normal, None) => return Err(ChoiceError::MissingNormalTarget),
            (MoveTarget::Normal, Some(_)) | (_, None) => {}
            (other, Some(_)) => return Err(ChoiceError::UnexpectedNormalTarget(other)),
        }

        check_target_list(battle, &possible_targets)?;
        let (min, max) = category.target_count();
        if possible_targets.len() < min || possible_targets.len() > max {
            return Err(ChoiceError::TargetCount {
                category,
                min,
                max,
                found: possible_targets.len(),
            });
        }
        for &target in &possible_targets {
            check_relationship(battle, attacker, category, normal_target, target)?;
        }

        Ok(Self {
            attacker,
            slot,
            move_id,
            terastallize,
            normal_target,
            possible_targets,
        })
    }

    pub fn attacker(&self) -> PokemonRef {
        self.attacker
    }

    /// The active slot the attacker held when the choice was made.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn move_id(&self) -> &MoveId {
        &self.move_id
    }

    pub fn terastallize(&self) -> bool {
        self.terastallize
    }

    pub fn normal_target(&self) -> Option<NormalTarget> {
        self.normal_target
    }

    pub fn possible_targets(&self) -> &[PokemonRef] {
        &self.possible_targets
    }
}

pub fn can_terastallize(battle: &BattleState, pokemon: PokemonRef) -> bool {
    !battle.side(pokemon.side).terastallized
        && battle
            .pokemon(pokemon)
            .is_some_and(|p| p.tera_type.is_some() && !p.terastallized)
}

/// Duplicates, fainted and benched creatures are never targetable.
fn check_target_list(battle: &BattleState, targets: &[PokemonRef]) -> ChoiceResult<()> {
    for (i, &target) in targets.iter().enumerate() {
        if targets[..i].contains(&target) {
            return Err(ChoiceError::DuplicateTarget(target));
        }
        let pokemon = battle
            .pokemon(target)
            .ok_or(ChoiceError::UnknownCreature(target))?;
        if pokemon.is_fainted() {
            return Err(ChoiceError::FaintedTarget(target));
        }
        if battle.slot_of(target).is_none() {
            return Err(ChoiceError::TargetNotActive(target));
        }
    }
    Ok(())
}

fn check_relationship(
    battle: &BattleState,
    attacker: PokemonRef,
    category: MoveTarget,
    normal_target: Option<NormalTarget>,
    target: PokemonRef,
) -> ChoiceResult<()> {
    let same_side = target.side == attacker.side;
    let is_user = target == attacker;
    let adjacent = battle.is_adjacent(attacker, target);
    let illegal = |reason: &'static str| {
        Err(ChoiceError::IllegalTarget {
            category,
            target,
            reason,
        })
    };

    match category {
        MoveTarget::Normal => {
            let slot = battle.slot_of(target);
            let matches = match normal_target {
                Some(NormalTarget::Foe(want)) => !same_side && slot == Some(want),
                Some(NormalTarget::Ally(want)) => same_side && !is_user && slot == Some(want),
                None => false,
            };
            if !matches {
                return Err(ChoiceError::NormalTargetMismatch(target));
            }
            if !adjacent {
                return illegal("not adjacent to the user");
            }
        }
        MoveTarget::User => {
            if !is_user {
                return illegal("must be the user");
            }
        }
        MoveTarget::AdjacentAlly => {
            if !same_side || is_user {
                return illegal("must be an ally other than the user");
            }
            if !adjacent {
                return illegal("not adjacent to the user");
            }
        }
        MoveTarget::AdjacentAllyOrSelf => {
            if !is_user && !(same_side && adjacent) {
                return illegal("must be the user or an adjacent ally");
            }
        }
        MoveTarget::AdjacentFoe => {
            if same_side {
                return illegal("must be a foe");
            }
            if !adjacent {
                return illegal("not adjacent to the user");
            }
        }
        MoveTarget::Any => {
            if is_user {
                return illegal("cannot be the user");
            }
        }
        MoveTarget::AllAdjacentFoes | MoveTarget::RandomNormal => {
            if same_side {
                return illegal("must be a foe");
            }
        }
        MoveTarget::AllAdjacent => {
            if is_user {
                return illegal("cannot be the user");
            }
            if !adjacent {
                return illegal("not adjacent to the user");
            }
        }
        MoveTarget::Allies => {
            if !same_side {
                return illegal("must be on the user's side");
            }
        }
        // Counted out above.
        MoveTarget::Field
        | MoveTarget::AllySide
        | MoveTarget::FoeSide
        | MoveTarget::AllyTeam
        | MoveTarget::Scripted => return illegal("takes no creature targets"),
    }
    Ok(())
}
