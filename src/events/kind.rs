//! The closed set of hook points and the contract each one declares.

use super::descriptor::Scope;
use super::relay::{RelayKind, RelayKinds, RelayValue};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// What an event is fired at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetShape {
    Pokemon,
    Side,
    Field,
    Battle,
}

/// Which returned values halt a firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VetoRule {
    /// Only an explicit `Bool(false)`.
    False,
    /// `Bool(false)` or `Int(0)`.
    FalseOrZero,
    /// Any `Bool`. For kinds where `true` is as final as `false`, such as
    /// a forced hit.
    AnyBool,
}

/// The fixed contract of one event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSignature {
    pub target: TargetShape,
    /// The variant the firing starts from, `None` for void events.
    pub relay: Option<RelayKind>,
    pub returns: RelayKinds,
    pub veto: VetoRule,
    pub uses_speed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum EventKind {
    // Gates on a creature
    BeforeMove,
    TryMove,
    TryHit,
    Invulnerability,
    Immunity,
    SetStatus,
    TryAddVolatile,

    // Numeric modifiers
    ModifyPriority,
    BasePower,
    ModifyAtk,
    ModifyDef,
    ModifySpA,
    ModifySpD,
    ModifySpe,
    ModifyCritRatio,
    ModifyDamage,
    Accuracy,
    Damage,
    TryHeal,
    ModifyAccuracy,
    ModifyStab,

    // Structured modifiers
    Type,
    CalculateStats,
    ModifySecondaries,
    RedirectTarget,
    LockMove,

    // Notifications on a creature
    Start,
    End,
    SwitchIn,
    SwitchOut,
    BeforeTurn,
    DamagingHit,
    AfterMove,
    AfterSetStatus,
    Faint,
    AfterFaint,
    Residual,

    // Side and field
    SideStart,
    SideEnd,
    SideResidual,
    FieldStart,
    FieldEnd,
    FieldResidual,
    SetWeather,

    BattleStart,
}

const GATE: RelayKinds = RelayKinds::ABSENT.union(RelayKinds::BOOL);
const INT_MOD: RelayKinds = RelayKinds::ABSENT.union(RelayKinds::INT);
const INT_OR_STOP: RelayKinds = INT_MOD.union(RelayKinds::BOOL);
const VOID: RelayKinds = RelayKinds::ABSENT;

impl EventKind {
    pub const fn signature(self) -> EventSignature {
        use EventKind::*;
        use TargetShape as T;

        let (target, relay, returns, veto, uses_speed) = match self {
            BeforeMove => (T::Pokemon, Some(RelayKind::Bool), GATE, VetoRule::False, true),
            TryMove | TryHit | Invulnerability | Immunity => {
                (T::Pokemon, Some(RelayKind::Bool), GATE, VetoRule::False, false)
            }
            SetStatus | TryAddVolatile => {
                (T::Pokemon, Some(RelayKind::Effect), GATE, VetoRule::False, false)
            }

            ModifyPriority | BasePower | ModifyAtk | ModifyDef | ModifySpA | ModifySpD
            | ModifySpe | ModifyCritRatio | ModifyDamage => {
                (T::Pokemon, Some(RelayKind::Int), INT_MOD, VetoRule::False, false)
            }
            Accuracy => (T::Pokemon, Some(RelayKind::Int), INT_OR_STOP, VetoRule::AnyBool, false),
            Damage | TryHeal => (
                T::Pokemon,
                Some(RelayKind::Int),
                INT_OR_STOP,
                VetoRule::FalseOrZero,
                false,
            ),
            ModifyAccuracy | ModifyStab => (
                T::Pokemon,
                Some(RelayKind::Decimal),
                RelayKinds::ABSENT.union(RelayKinds::DECIMAL),
                VetoRule::False,
                false,
            ),

            Type => (
                T::Pokemon,
                Some(RelayKind::Types),
                RelayKinds::ABSENT.union(RelayKinds::TYPES),
                VetoRule::False,
                false,
            ),
            CalculateStats => (
                T::Pokemon,
                Some(RelayKind::Stats),
                RelayKinds::ABSENT.union(RelayKinds::STATS),
                VetoRule::False,
                false,
            ),
            ModifySecondaries => (
                T::Pokemon,
                Some(RelayKind::Secondaries),
                RelayKinds::ABSENT.union(RelayKinds::SECONDARIES),
                VetoRule::False,
                false,
            ),
            RedirectTarget => (
                T::Pokemon,
                Some(RelayKind::Pokemon),
                RelayKinds::ABSENT.union(RelayKinds::POKEMON),
                VetoRule::False,
                false,
            ),
            LockMove => (
                T::Pokemon,
                None,
                RelayKinds::ABSENT.union(RelayKinds::MOVE),
                VetoRule::False,
                false,
            ),

            Start => (T::Pokemon, None, GATE, VetoRule::False, false),
            End | SwitchOut => (T::Pokemon, None, VOID, VetoRule::False, false),
            SwitchIn | BeforeTurn | AfterMove | Faint | AfterFaint | Residual => {
                (T::Pokemon, None, VOID, VetoRule::False, true)
            }
            DamagingHit => (T::Pokemon, Some(RelayKind::Int), VOID, VetoRule::False, true),
            AfterSetStatus => (T::Pokemon, Some(RelayKind::Effect), VOID, VetoRule::False, false),

            SideStart => (T::Side, None, GATE, VetoRule::False, false),
            SideEnd => (T::Side, None, VOID, VetoRule::False, false),
            SideResidual => (T::Side, None, VOID, VetoRule::False, true),
            FieldStart => (T::Field, None, GATE, VetoRule::False, false),
            FieldEnd => (T::Field, None, VOID, VetoRule::False, false),
            FieldResidual => (T::Field, None, VOID, VetoRule::False, true),
            SetWeather => (T::Field, Some(RelayKind::Effect), GATE, VetoRule::False, false),

            BattleStart => (T::Battle, None, VOID, VetoRule::False, false),
        };

        EventSignature {
            target,
            relay,
            returns,
            veto,
            uses_speed,
        }
    }

    /// Display name with the perspective prefix, e.g. `FoeModifyAccuracy`.
    pub fn prefixed(self, scope: Scope) -> String {
        format!("{}{}", scope.prefix(), self)
    }

    /// The residual kind that ticks effects of a given target shape.
    pub fn residual_for(shape: TargetShape) -> Option<EventKind> {
        match shape {
            TargetShape::Pokemon => Some(EventKind::Residual),
            TargetShape::Side => Some(EventKind::SideResidual),
            TargetShape::Field => Some(EventKind::FieldResidual),
            TargetShape::Battle => None,
        }
    }

    /// The kind that announces an effect ending on a target of this shape.
    pub fn end_for(shape: TargetShape) -> Option<EventKind> {
        match shape {
            TargetShape::Pokemon => Some(EventKind::End),
            TargetShape::Side => Some(EventKind::SideEnd),
            TargetShape::Field => Some(EventKind::FieldEnd),
            TargetShape::Battle => None,
        }
    }

    pub fn start_for(shape: TargetShape) -> Option<EventKind> {
        match shape {
            TargetShape::Pokemon => Some(EventKind::Start),
            TargetShape::Side => Some(EventKind::SideStart),
            TargetShape::Field => Some(EventKind::FieldStart),
            TargetShape::Battle => None,
        }
    }
}

impl VetoRule {
    /// Whether `value` halts a firing under this rule.
    pub fn halts(self, value: &RelayValue) -> bool {
        match (value, self) {
            (RelayValue::Bool(false), _) => true,
            (RelayValue::Int(0), VetoRule::FalseOrZero) => true,
            (RelayValue::Bool(true), VetoRule::AnyBool) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_kind_can_return_absent() {
        for kind in EventKind::iter() {
            assert!(
                kind.signature().returns.contains(RelayKinds::ABSENT),
                "{} must allow handlers to pass",
                kind
            );
        }
    }

    #[test]
    fn test_relay_input_is_a_declared_return_or_void() {
        // A kind may only start from a variant its handlers could also
        // hand back, unless it is a gate over a non-bool payload.
        for kind in EventKind::iter() {
            let sig = kind.signature();
            if let Some(relay) = sig.relay {
                let gates_payload = sig.returns == GATE;
                let void = sig.returns == VOID;
                assert!(
                    gates_payload || void || sig.returns.contains(relay.flag()),
                    "{} starts from {} but cannot return it",
                    kind,
                    relay
                );
            }
        }
    }

    #[test]
    fn test_modify_accuracy_only_yields_decimal_or_absent() {
        let sig = EventKind::ModifyAccuracy.signature();
        assert_eq!(sig.returns, RelayKinds::ABSENT | RelayKinds::DECIMAL);
        assert_eq!(sig.relay, Some(RelayKind::Decimal));
    }

    #[test]
    fn test_damage_treats_zero_as_veto() {
        let sig = EventKind::Damage.signature();
        assert!(sig.veto.halts(&RelayValue::Int(0)));
        assert!(!EventKind::BasePower.signature().veto.halts(&RelayValue::Int(0)));
        assert!(sig.veto.halts(&RelayValue::Bool(false)));
    }

    #[test]
    fn test_accuracy_halts_on_either_bool() {
        let veto = EventKind::Accuracy.signature().veto;
        assert!(veto.halts(&RelayValue::Bool(true)));
        assert!(veto.halts(&RelayValue::Bool(false)));
        assert!(!veto.halts(&RelayValue::Int(0)));
        assert!(!EventKind::TryHit.signature().veto.halts(&RelayValue::Bool(true)));
    }

    #[test]
    fn test_prefixed_names() {
        assert_eq!(EventKind::ModifyAccuracy.prefixed(Scope::Foe), "FoeModifyAccuracy");
        assert_eq!(EventKind::BeforeMove.prefixed(Scope::Own), "BeforeMove");
    }
}
