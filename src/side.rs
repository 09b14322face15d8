use crate::effects::{EffectId, EffectSource};
use crate::pokemon::{PokemonInst, PokemonRef};
use schema::SideId;

/// One side of the battle: a trainer's roster, its active slots, and the
/// conditions that sit on the side or on individual slots.
#[derive(Debug, Clone)]
pub struct Side {
    pub id: SideId,
    // A unique identifier. For a human, this could be their UserID.
    pub player_id: String,
    pub player_name: String,

    pub roster: Vec<PokemonInst>,

    // slot -> roster index of the creature currently in it
    pub active: Vec<Option<usize>>,

    pub side_conditions: Vec<EffectSource>,
    // one list per active slot
    pub slot_conditions: Vec<Vec<EffectSource>>,

    pub terastallized: bool,
}

impl Side {
    pub fn new(
        id: SideId,
        player_id: impl Into<String>,
        player_name: impl Into<String>,
        roster: Vec<PokemonInst>,
        active_slots: usize,
    ) -> Self {
        Side {
            id,
            player_id: player_id.into(),
            player_name: player_name.into(),
            roster,
            active: vec![None; active_slots],
            side_conditions: Vec::new(),
            slot_conditions: vec![Vec::new(); active_slots],
            terastallized: false,
        }
    }

    pub fn pokemon_ref(&self, index: usize) -> PokemonRef {
        PokemonRef::new(self.id, index)
    }

    pub fn pokemon(&self, index: usize) -> Option<&PokemonInst> {
        self.roster.get(index)
    }

    pub fn pokemon_mut(&mut self, index: usize) -> Option<&mut PokemonInst> {
        self.roster.get_mut(index)
    }

    /// Roster index in `slot`, if the slot is filled.
    pub fn occupant(&self, slot: usize) -> Option<usize> {
        self.active.get(slot).copied().flatten()
    }

    /// Active creatures in slot order.
    pub fn active_refs(&self) -> Vec<PokemonRef> {
        self.active
            .iter()
            .flatten()
            .map(|&index| self.pokemon_ref(index))
            .collect()
    }

    pub fn slot_of(&self, index: usize) -> Option<usize> {
        self.active.iter().position(|slot| *slot == Some(index))
    }

    /// Benched creatures that could be switched in.
    pub fn switch_candidates(&self) -> Vec<usize> {
        self.roster
            .iter()
            .enumerate()
            .filter(|(index, pokemon)| !pokemon.is_fainted() && self.slot_of(*index).is_none())
            .map(|(index, _)| index)
            .collect()
    }

    /// Slots holding a fainted creature (or nothing) that a benched creature
    /// could fill.
    pub fn slots_needing_switch(&self) -> Vec<bool> {
        let has_bench = !self.switch_candidates().is_empty();
        self.active
            .iter()
            .map(|slot| {
                has_bench
                    && match slot {
                        Some(index) => self.roster[*index].is_fainted(),
                        None => true,
                    }
            })
            .collect()
    }

    pub fn pokemon_left(&self) -> usize {
        self.roster.iter().filter(|p| !p.is_fainted()).count()
    }

    pub fn is_defeated(&self) -> bool {
        self.pokemon_left() == 0
    }

    pub fn has_side_condition(&self, id: &EffectId) -> bool {
        self.side_conditions.iter().any(|c| &c.id == id)
    }

    pub fn detach_side_condition(&mut self, effect_order: u64) -> Option<EffectSource> {
        let index = self
            .side_conditions
            .iter()
            .position(|c| c.state.effect_order == effect_order)?;
        Some(self.side_conditions.remove(index))
    }

    pub fn detach_slot_condition(&mut self, slot: usize, effect_order: u64) -> Option<EffectSource> {
        let conditions = self.slot_conditions.get_mut(slot)?;
        let index = conditions
            .iter()
            .position(|c| c.state.effect_order == effect_order)?;
        Some(conditions.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveId;
    use crate::pokemon::MoveSlot;
    use schema::{PokemonType, StatTable};

    fn mon(name: &str) -> PokemonInst {
        PokemonInst::new(
            name,
            name,
            50,
            vec![PokemonType::Normal],
            StatTable::new(100, 50, 50, 50, 50, 50),
            vec![MoveSlot::new(MoveId::from("tackle"), 35)],
        )
    }

    #[test]
    fn test_switch_candidates_skip_active_and_fainted() {
        let mut side = Side::new(SideId::P1, "p1", "Player 1", vec![mon("a"), mon("b"), mon("c")], 1);
        side.active[0] = Some(0);
        side.roster[2].set_hp(0);

        assert_eq!(side.switch_candidates(), vec![1]);
        assert_eq!(side.slot_of(0), Some(0));
        assert_eq!(side.active_refs(), vec![PokemonRef::new(SideId::P1, 0)]);
    }

    #[test]
    fn test_fainted_active_needs_switch_only_with_bench() {
        let mut side = Side::new(SideId::P2, "p2", "Player 2", vec![mon("a"), mon("b")], 1);
        side.active[0] = Some(0);
        side.roster[0].set_hp(0);
        assert_eq!(side.slots_needing_switch(), vec![true]);

        side.roster[1].set_hp(0);
        assert_eq!(side.slots_needing_switch(), vec![false]);
        assert!(side.is_defeated());
    }
}
