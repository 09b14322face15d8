use crate::battle::state::BattleState;
use crate::errors::{ChoiceError, ChoiceResult};
use crate::pokemon::PokemonRef;
use serde::Serialize;

/// Replacing an active creature with a benched one from the same side.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchChoice {
    out: PokemonRef,
    into: PokemonRef,
    slot: usize,
}

impl SwitchChoice {
    /// `out` may have fainted; a forced switch replaces it.
    pub fn new(battle: &BattleState, out: PokemonRef, into: PokemonRef) -> ChoiceResult<Self> {
        if out == into {
            return Err(ChoiceError::SwitchIntoSelf(out));
        }
        if out.side != into.side {
            return Err(ChoiceError::CrossSideSwitch { out, into });
        }
        battle.pokemon(out).ok_or(ChoiceError::UnknownCreature(out))?;
        let incoming = battle.pokemon(into).ok_or(ChoiceError::UnknownCreature(into))?;

        let slot = battle
            .slot_of(out)
            .ok_or(ChoiceError::SwitchOutNotActive(out))?;
        if battle.slot_of(into).is_some() {
            return Err(ChoiceError::SwitchInAlreadyActive(into));
        }
        if incoming.is_fainted() {
            return Err(ChoiceError::SwitchInFainted(into));
        }

        Ok(Self { out, into, slot })
    }

    pub fn out(&self) -> PokemonRef {
        self.out
    }

    pub fn into_pokemon(&self) -> PokemonRef {
        self.into
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}
