use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};

/// One of the two sides of a battle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SideId {
    P1,
    P2,
}

impl SideId {
    pub fn index(self) -> usize {
        match self {
            SideId::P1 => 0,
            SideId::P2 => 1,
        }
    }

    pub fn foe(self) -> SideId {
        match self {
            SideId::P1 => SideId::P2,
            SideId::P2 => SideId::P1,
        }
    }

    pub fn from_index(index: usize) -> Option<SideId> {
        match index {
            0 => Some(SideId::P1),
            1 => Some(SideId::P2),
            _ => None,
        }
    }
}

impl fmt::Display for SideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideId::P1 => write!(f, "p1"),
            SideId::P2 => write!(f, "p2"),
        }
    }
}

/// The battle format's shape: how many creatures are active per side and
/// how many are brought from team preview.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum GameType {
    Singles,
    Doubles,
}

impl GameType {
    pub fn active_slots(self) -> usize {
        match self {
            GameType::Singles => 1,
            GameType::Doubles => 2,
        }
    }

    /// Creatures that must be ordered at team preview.
    pub fn team_size(self) -> usize {
        match self {
            GameType::Singles => 6,
            GameType::Doubles => 4,
        }
    }

    pub fn is_multi_active(self) -> bool {
        self.active_slots() > 1
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

/// Which creatures a move may be aimed at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum MoveTarget {
    /// One adjacent creature of the user's choice.
    Normal,
    /// The user itself.
    User,
    AdjacentAlly,
    AdjacentAllyOrSelf,
    AdjacentFoe,
    /// Any other creature on the field, adjacent or not.
    Any,
    AllAdjacentFoes,
    AllAdjacent,
    Allies,
    RandomNormal,
    /// The whole field (weather, terrain, pseudo-weather).
    Field,
    AllySide,
    FoeSide,
    AllyTeam,
    Scripted,
}

impl MoveTarget {
    /// Inclusive bounds on how many creatures a validated choice may list.
    pub fn target_count(self) -> (usize, usize) {
        match self {
            MoveTarget::Normal
            | MoveTarget::User
            | MoveTarget::AdjacentAlly
            | MoveTarget::AdjacentAllyOrSelf
            | MoveTarget::AdjacentFoe
            | MoveTarget::Any => (1, 1),
            MoveTarget::AllAdjacentFoes | MoveTarget::RandomNormal | MoveTarget::Allies => (1, 2),
            MoveTarget::AllAdjacent => (1, 3),
            MoveTarget::Field
            | MoveTarget::AllySide
            | MoveTarget::FoeSide
            | MoveTarget::AllyTeam
            | MoveTarget::Scripted => (0, 0),
        }
    }

    pub fn needs_chosen_target(self) -> bool {
        matches!(self, MoveTarget::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_foe_round_trips() {
        assert_eq!(SideId::P1.foe(), SideId::P2);
        assert_eq!(SideId::P1.foe().foe(), SideId::P1);
        assert_eq!(SideId::from_index(1), Some(SideId::P2));
        assert_eq!(SideId::from_index(2), None);
    }

    #[test]
    fn test_field_targets_take_no_creatures() {
        assert_eq!(MoveTarget::Field.target_count(), (0, 0));
        assert_eq!(MoveTarget::AllAdjacent.target_count(), (1, 3));
        assert!(MoveTarget::Normal.needs_chosen_target());
        assert!(!MoveTarget::Any.needs_chosen_target());
    }
}
