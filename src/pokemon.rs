use crate::effects::{EffectId, EffectKind, EffectSource};
use crate::moves::MoveId;
use schema::{PokemonType, SideId, StatTable, StatType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Addresses one creature: its side and its index in that side's roster.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PokemonRef {
    pub side: SideId,
    pub index: usize,
}

impl PokemonRef {
    pub fn new(side: SideId, index: usize) -> Self {
        Self { side, index }
    }
}

impl fmt::Display for PokemonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.side, self.index)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveSlot {
    pub id: MoveId,
    pub pp: u8,
    pub max_pp: u8,
    pub disabled: bool,
}

impl MoveSlot {
    pub fn new(id: MoveId, max_pp: u8) -> Self {
        Self {
            id,
            pp: max_pp,
            max_pp,
            disabled: false,
        }
    }

    pub fn usable(&self) -> bool {
        self.pp > 0 && !self.disabled
    }
}

#[derive(Debug, Clone)]
pub struct PokemonInst {
    pub name: String,
    pub species: String,
    pub level: u8,
    pub types: Vec<PokemonType>,
    /// `hp` here is max HP.
    pub stats: StatTable,
    pub current_hp: u16,
    pub moves: Vec<MoveSlot>,
    pub tera_type: Option<PokemonType>,
    pub terastallized: bool,

    // HashMap for stat stage modifications, value is stage (-6 to +6)
    pub boosts: HashMap<StatType, i8>,

    pub ability: Option<EffectSource>,
    pub item: Option<EffectSource>,
    pub status: Option<EffectSource>,
    pub volatiles: Vec<EffectSource>,
    pub ability_suppressed: bool,
    pub item_suppressed: bool,

    /// Active slot index while on the field.
    pub position: Option<usize>,
    pub last_move: Option<MoveId>,
}

impl PokemonInst {
    pub fn new(
        name: impl Into<String>,
        species: impl Into<String>,
        level: u8,
        types: Vec<PokemonType>,
        stats: StatTable,
        moves: Vec<MoveSlot>,
    ) -> Self {
        Self {
            name: name.into(),
            species: species.into(),
            level,
            types,
            current_hp: stats.hp,
            stats,
            moves,
            tera_type: None,
            terastallized: false,
            boosts: HashMap::new(),
            ability: None,
            item: None,
            status: None,
            volatiles: Vec::new(),
            ability_suppressed: false,
            item_suppressed: false,
            position: None,
            last_move: None,
        }
    }

    pub fn max_hp(&self) -> u16 {
        self.stats.hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    pub fn is_active(&self) -> bool {
        self.position.is_some()
    }

    pub fn set_hp(&mut self, hp: u16) {
        self.current_hp = hp.min(self.max_hp());
    }

    /// Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: u16) -> u16 {
        let dealt = amount.min(self.current_hp);
        self.current_hp -= dealt;
        dealt
    }

    /// Returns the HP actually restored.
    pub fn heal(&mut self, amount: u16) -> u16 {
        let missing = self.max_hp() - self.current_hp;
        let healed = amount.min(missing);
        self.current_hp += healed;
        healed
    }

    pub fn knows_move(&self, id: &MoveId) -> bool {
        self.moves.iter().any(|slot| &slot.id == id)
    }

    pub fn move_slot(&self, id: &MoveId) -> Option<&MoveSlot> {
        self.moves.iter().find(|slot| &slot.id == id)
    }

    pub fn move_slot_mut(&mut self, id: &MoveId) -> Option<&mut MoveSlot> {
        self.moves.iter_mut().find(|slot| &slot.id == id)
    }

    pub fn boost(&self, stat: StatType) -> i8 {
        self.boosts.get(&stat).copied().unwrap_or(0)
    }

    /// Applies `delta` clamped to -6..=6 and returns (old, new).
    pub fn apply_boost(&mut self, stat: StatType, delta: i8) -> (i8, i8) {
        let old = self.boost(stat);
        let new = (old + delta).clamp(-6, 6);
        if new == 0 {
            self.boosts.remove(&stat);
        } else {
            self.boosts.insert(stat, new);
        }
        (old, new)
    }

    /// The speed stat after boosts, without any event modifiers. This is the
    /// value handler ordering compares.
    pub fn speed_stat(&self) -> u32 {
        crate::battle::stats::apply_stat_stage_multiplier(self.stats.speed, self.boost(StatType::Speed))
            as u32
    }

    pub fn has_volatile(&self, id: &EffectId) -> bool {
        self.volatiles.iter().any(|v| &v.id == id)
    }

    pub fn has_status(&self, id: &EffectId) -> bool {
        self.status.as_ref().is_some_and(|s| &s.id == id)
    }

    /// Attached sources in collection order: status, volatiles, ability, item.
    pub fn attached(&self) -> impl Iterator<Item = &EffectSource> {
        self.status
            .iter()
            .chain(self.volatiles.iter())
            .chain(self.ability.iter())
            .chain(self.item.iter())
    }

    pub fn attached_mut(&mut self) -> impl Iterator<Item = &mut EffectSource> {
        self.status
            .iter_mut()
            .chain(self.volatiles.iter_mut())
            .chain(self.ability.iter_mut())
            .chain(self.item.iter_mut())
    }

    /// Removes the source with this registration sequence, if attached.
    pub fn detach(&mut self, effect_order: u64) -> Option<EffectSource> {
        let matches = |s: &Option<EffectSource>| {
            s.as_ref().is_some_and(|s| s.state.effect_order == effect_order)
        };
        if matches(&self.status) {
            return self.status.take();
        }
        if matches(&self.ability) {
            return self.ability.take();
        }
        if matches(&self.item) {
            return self.item.take();
        }
        let index = self
            .volatiles
            .iter()
            .position(|v| v.state.effect_order == effect_order)?;
        Some(self.volatiles.remove(index))
    }

    /// Places an already-numbered source in the right attachment point.
    /// Returns the displaced source, if any.
    pub fn attach(&mut self, source: EffectSource) -> Option<EffectSource> {
        match source.kind {
            EffectKind::Ability => self.ability.replace(source),
            EffectKind::Item => self.item.replace(source),
            EffectKind::Status => self.status.replace(source),
            _ => {
                self.volatiles.push(source);
                None
            }
        }
    }

    /// Volatiles and boosts do not survive leaving the field.
    pub fn clear_on_switch_out(&mut self) -> Vec<EffectSource> {
        self.boosts.clear();
        self.position = None;
        self.ability_suppressed = false;
        std::mem::take(&mut self.volatiles)
    }
}
