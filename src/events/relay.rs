//! The value threaded through an event firing.

use crate::effects::EffectId;
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use bitflags::bitflags;
use ordered_float::OrderedFloat;
use schema::{PokemonType, StatTable, StatType};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// A secondary effect a damaging move may roll after it hits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Secondary {
    /// Percent chance, 1..=100.
    pub chance: u8,
    pub status: Option<EffectId>,
    pub volatile: Option<EffectId>,
    pub boosts: Vec<(StatType, i8)>,
    /// Apply to the move's user instead of the target.
    pub on_user: bool,
}

impl Secondary {
    pub fn status(chance: u8, status: impl Into<EffectId>) -> Self {
        Self {
            chance,
            status: Some(status.into()),
            volatile: None,
            boosts: Vec::new(),
            on_user: false,
        }
    }

    pub fn volatile(chance: u8, volatile: impl Into<EffectId>) -> Self {
        Self {
            chance,
            status: None,
            volatile: Some(volatile.into()),
            boosts: Vec::new(),
            on_user: false,
        }
    }

    pub fn boost(chance: u8, stat: StatType, stages: i8, on_user: bool) -> Self {
        Self {
            chance,
            status: None,
            volatile: None,
            boosts: vec![(stat, stages)],
            on_user,
        }
    }
}

/// The running result of an event firing.
///
/// `Absent` means "no opinion": a handler returning it leaves the current
/// value unchanged. `Bool(false)` is a veto for every kind; some kinds also
/// treat `Int(0)` as one (see [`VetoRule`](super::VetoRule)).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RelayValue {
    #[default]
    Absent,
    Bool(bool),
    Int(i32),
    Decimal(OrderedFloat<f64>),
    Pokemon(PokemonRef),
    Move(MoveId),
    Effect(EffectId),
    Types(Vec<PokemonType>),
    Stats(StatTable),
    Secondaries(Vec<Secondary>),
}

/// The variant tag of a [`RelayValue`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RelayKind {
    Absent,
    Bool,
    Int,
    Decimal,
    Pokemon,
    Move,
    Effect,
    Types,
    Stats,
    Secondaries,
}

bitflags! {
    /// A closed set of relay variants, used to declare what an event kind or
    /// a callback may yield.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RelayKinds: u16 {
        const ABSENT      = 1 << 0;
        const BOOL        = 1 << 1;
        const INT         = 1 << 2;
        const DECIMAL     = 1 << 3;
        const POKEMON     = 1 << 4;
        const MOVE        = 1 << 5;
        const EFFECT      = 1 << 6;
        const TYPES       = 1 << 7;
        const STATS       = 1 << 8;
        const SECONDARIES = 1 << 9;
    }
}

impl RelayKind {
    pub fn flag(self) -> RelayKinds {
        match self {
            RelayKind::Absent => RelayKinds::ABSENT,
            RelayKind::Bool => RelayKinds::BOOL,
            RelayKind::Int => RelayKinds::INT,
            RelayKind::Decimal => RelayKinds::DECIMAL,
            RelayKind::Pokemon => RelayKinds::POKEMON,
            RelayKind::Move => RelayKinds::MOVE,
            RelayKind::Effect => RelayKinds::EFFECT,
            RelayKind::Types => RelayKinds::TYPES,
            RelayKind::Stats => RelayKinds::STATS,
            RelayKind::Secondaries => RelayKinds::SECONDARIES,
        }
    }
}

impl RelayKinds {
    /// The individual variants in this set, in declaration order.
    pub fn kinds(self) -> impl Iterator<Item = RelayKind> {
        RelayKind::iter().filter(move |kind| self.contains(kind.flag()))
    }
}

impl RelayValue {
    pub fn decimal(value: f64) -> Self {
        RelayValue::Decimal(OrderedFloat(value))
    }

    pub fn kind(&self) -> RelayKind {
        match self {
            RelayValue::Absent => RelayKind::Absent,
            RelayValue::Bool(_) => RelayKind::Bool,
            RelayValue::Int(_) => RelayKind::Int,
            RelayValue::Decimal(_) => RelayKind::Decimal,
            RelayValue::Pokemon(_) => RelayKind::Pokemon,
            RelayValue::Move(_) => RelayKind::Move,
            RelayValue::Effect(_) => RelayKind::Effect,
            RelayValue::Types(_) => RelayKind::Types,
            RelayValue::Stats(_) => RelayKind::Stats,
            RelayValue::Secondaries(_) => RelayKind::Secondaries,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RelayValue::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RelayValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            RelayValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            RelayValue::Decimal(value) => Some(value.into_inner()),
            _ => None,
        }
    }

    pub fn as_pokemon(&self) -> Option<PokemonRef> {
        match self {
            RelayValue::Pokemon(pokemon) => Some(*pokemon),
            _ => None,
        }
    }

    pub fn as_move(&self) -> Option<&MoveId> {
        match self {
            RelayValue::Move(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_effect(&self) -> Option<&EffectId> {
        match self {
            RelayValue::Effect(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_types(&self) -> Option<&[PokemonType]> {
        match self {
            RelayValue::Types(types) => Some(types),
            _ => None,
        }
    }

    pub fn as_stats(&self) -> Option<StatTable> {
        match self {
            RelayValue::Stats(stats) => Some(*stats),
            _ => None,
        }
    }

    pub fn as_secondaries(&self) -> Option<&[Secondary]> {
        match self {
            RelayValue::Secondaries(secondaries) => Some(secondaries),
            _ => None,
        }
    }

    /// How a gate-style result reads to the caller: anything but an explicit
    /// `false` or a zero lets the action proceed.
    pub fn passes(&self) -> bool {
        !matches!(self, RelayValue::Bool(false) | RelayValue::Int(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_flags_cover_every_variant() {
        let all = RelayKind::iter().fold(RelayKinds::empty(), |acc, kind| acc | kind.flag());
        assert_eq!(all, RelayKinds::all());
    }

    #[test]
    fn test_kinds_iterates_members_only() {
        let set = RelayKinds::ABSENT | RelayKinds::DECIMAL;
        let members: Vec<RelayKind> = set.kinds().collect();
        assert_eq!(members, vec![RelayKind::Absent, RelayKind::Decimal]);
    }

    #[test]
    fn test_passes_treats_false_and_zero_as_closed() {
        assert!(RelayValue::Absent.passes());
        assert!(RelayValue::Bool(true).passes());
        assert!(RelayValue::Int(12).passes());
        assert!(!RelayValue::Bool(false).passes());
        assert!(!RelayValue::Int(0).passes());
    }

    #[test]
    fn test_decimal_accessor() {
        let value = RelayValue::decimal(1.5);
        assert_eq!(value.kind(), RelayKind::Decimal);
        assert_eq!(value.as_decimal(), Some(1.5));
        assert_eq!(value.as_int(), None);
    }
}
