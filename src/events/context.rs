use super::kind::{EventKind, TargetShape};
use super::relay::{RelayKind, RelayValue, Secondary};
use crate::effects::{EffectId, EffectKind};
use crate::errors::{DispatchError, DispatchResult};
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use schema::{PokemonType, SideId, StatTable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a firing is aimed at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Pokemon(PokemonRef),
    Side(SideId),
    Field,
    Battle,
}

impl EventTarget {
    pub fn shape(self) -> TargetShape {
        match self {
            EventTarget::Pokemon(_) => TargetShape::Pokemon,
            EventTarget::Side(_) => TargetShape::Side,
            EventTarget::Field => TargetShape::Field,
            EventTarget::Battle => TargetShape::Battle,
        }
    }

    pub fn pokemon(self) -> Option<PokemonRef> {
        match self {
            EventTarget::Pokemon(pokemon) => Some(pokemon),
            _ => None,
        }
    }

    /// The side a creature or side target belongs to.
    pub fn side(self) -> Option<SideId> {
        match self {
            EventTarget::Pokemon(pokemon) => Some(pokemon.side),
            EventTarget::Side(side) => Some(side),
            EventTarget::Field | EventTarget::Battle => None,
        }
    }
}

impl From<PokemonRef> for EventTarget {
    fn from(pokemon: PokemonRef) -> Self {
        EventTarget::Pokemon(pokemon)
    }
}

/// Where an attached effect source lives in the battle graph.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holder {
    Pokemon(PokemonRef),
    Slot { side: SideId, slot: usize },
    Side(SideId),
    Field,
    Format,
    /// The move currently executing, held by its user.
    ActiveMove(PokemonRef),
}

impl Holder {
    /// The event target an effect's own start/end/residual hooks fire at.
    pub fn as_target(self, occupant: Option<PokemonRef>) -> EventTarget {
        match self {
            Holder::Pokemon(pokemon) | Holder::ActiveMove(pokemon) => EventTarget::Pokemon(pokemon),
            Holder::Slot { side, .. } => match occupant {
                Some(pokemon) => EventTarget::Pokemon(pokemon),
                None => EventTarget::Side(side),
            },
            Holder::Side(side) => EventTarget::Side(side),
            Holder::Field => EventTarget::Field,
            Holder::Format => EventTarget::Battle,
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holder::Pokemon(pokemon) => write!(f, "{}", pokemon),
            Holder::Slot { side, slot } => write!(f, "{} slot {}", side, slot),
            Holder::Side(side) => write!(f, "{} side", side),
            Holder::Field => write!(f, "field"),
            Holder::Format => write!(f, "format"),
            Holder::ActiveMove(user) => write!(f, "{}'s move", user),
        }
    }
}

/// The immutable view a handler gets of the firing it is part of.
///
/// The battle itself is passed separately as `&mut BattleState`; the context
/// never borrows from it, so a handler is free to mutate the battle or fire
/// nested events.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub kind: EventKind,
    pub target: EventTarget,
    pub source: Option<PokemonRef>,
    pub source_effect: Option<&'a EffectId>,
    pub relay: &'a RelayValue,
    /// The holder of the effect whose handler is running.
    pub holder: Holder,
    pub effect: &'a EffectId,
    pub effect_kind: EffectKind,
    /// Registration sequence of the running effect, stable while attached.
    pub effect_order: u64,
}

impl<'a> EventContext<'a> {
    pub fn target_pokemon(&self) -> DispatchResult<PokemonRef> {
        self.target
            .pokemon()
            .ok_or(DispatchError::TargetShapeMismatch {
                kind: self.kind,
                expected: TargetShape::Pokemon,
                found: self.target.shape(),
            })
    }

    /// The creature holding the running effect, if it is held by one.
    pub fn holder_pokemon(&self) -> Option<PokemonRef> {
        match self.holder {
            Holder::Pokemon(pokemon) | Holder::ActiveMove(pokemon) => Some(pokemon),
            _ => None,
        }
    }

    fn mismatch(&self, expected: RelayKind) -> DispatchError {
        DispatchError::RelayTypeMismatch {
            kind: self.kind,
            expected: Some(expected),
            found: self.relay.kind(),
        }
    }

    pub fn relay_bool(&self) -> DispatchResult<bool> {
        self.relay.as_bool().ok_or_else(|| self.mismatch(RelayKind::Bool))
    }

    pub fn relay_int(&self) -> DispatchResult<i32> {
        self.relay.as_int().ok_or_else(|| self.mismatch(RelayKind::Int))
    }

    pub fn relay_decimal(&self) -> DispatchResult<f64> {
        self.relay
            .as_decimal()
            .ok_or_else(|| self.mismatch(RelayKind::Decimal))
    }

    pub fn relay_pokemon(&self) -> DispatchResult<PokemonRef> {
        self.relay
            .as_pokemon()
            .ok_or_else(|| self.mismatch(RelayKind::Pokemon))
    }

    pub fn relay_move(&self) -> DispatchResult<&'a MoveId> {
        self.relay.as_move().ok_or_else(|| self.mismatch(RelayKind::Move))
    }

    pub fn relay_effect(&self) -> DispatchResult<&'a EffectId> {
        self.relay
            .as_effect()
            .ok_or_else(|| self.mismatch(RelayKind::Effect))
    }

    pub fn relay_types(&self) -> DispatchResult<&'a [PokemonType]> {
        self.relay
            .as_types()
            .ok_or_else(|| self.mismatch(RelayKind::Types))
    }

    pub fn relay_stats(&self) -> DispatchResult<StatTable> {
        self.relay
            .as_stats()
            .ok_or_else(|| self.mismatch(RelayKind::Stats))
    }

    pub fn relay_secondaries(&self) -> DispatchResult<&'a [Secondary]> {
        self.relay
            .as_secondaries()
            .ok_or_else(|| self.mismatch(RelayKind::Secondaries))
    }
}
