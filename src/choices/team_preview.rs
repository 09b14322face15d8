use crate::battle::state::BattleState;
use crate::errors::{ChoiceError, ChoiceResult};
use crate::pokemon::PokemonRef;
use schema::SideId;
use serde::Serialize;

/// The creatures a side brings, in order. The first `active_slots` lead,
/// so position `i` is a one-to-one assignment onto slot `i`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TeamPreviewChoice {
    side: SideId,
    order: Vec<PokemonRef>,
}

impl TeamPreviewChoice {
    pub fn new(battle: &BattleState, order: Vec<PokemonRef>) -> ChoiceResult<Self> {
        let Some(side) = order.first().map(|p| p.side) else {
            return Err(ChoiceError::TeamSizeMismatch {
                expected: battle.game_type.team_size(),
                found: 0,
            });
        };

        let expected = team_preview_size(battle, side);
        if order.len() != expected {
            return Err(ChoiceError::TeamSizeMismatch {
                expected,
                found: order.len(),
            });
        }
        if order.iter().any(|p| p.side != side) {
            return Err(ChoiceError::MixedSides);
        }
        for (i, &pokemon) in order.iter().enumerate() {
            let inst = battle
                .pokemon(pokemon)
                .ok_or(ChoiceError::NotInRoster(pokemon))?;
            if order[..i].contains(&pokemon) {
                return Err(ChoiceError::DuplicateInPreview(pokemon));
            }
            if inst.is_fainted() {
                return Err(ChoiceError::FaintedInPreview(pokemon));
            }
        }

        Ok(Self { side, order })
    }

    pub fn side(&self) -> SideId {
        self.side
    }

    pub fn order(&self) -> &[PokemonRef] {
        &self.order
    }
}

/// The format's team size, capped by what the roster holds.
pub fn team_preview_size(battle: &BattleState, side: SideId) -> usize {
    battle
        .game_type
        .team_size()
        .min(battle.side(side).roster.len())
}
