//! Handler descriptors: one event kind + one perspective scope bound to a
//! callback, plus the metadata the dispatcher orders by.

use super::context::EventContext;
use super::kind::{EventKind, TargetShape};
use super::relay::{RelayKind, RelayKinds, RelayValue, Secondary};
use crate::battle::state::BattleState;
use crate::errors::{DescriptorError, DescriptorResult, DispatchResult};
use crate::pokemon::PokemonRef;
use schema::{PokemonType, StatTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strum::{EnumIter, IntoEnumIterator};

/// Whose attached effects are consulted for a firing, relative to its
/// target and source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, EnumIter)]
pub enum Scope {
    /// The holder is the event's target.
    #[default]
    Own,
    /// The holder is on the target's side but is not the target.
    Ally,
    /// The holder is on the side opposite the target.
    Foe,
    /// The holder is the event's source.
    Source,
    /// Always consulted.
    Any,
}

impl Scope {
    pub fn prefix(self) -> &'static str {
        match self {
            Scope::Own => "",
            Scope::Ally => "Ally",
            Scope::Foe => "Foe",
            Scope::Source => "Source",
            Scope::Any => "Any",
        }
    }
}

/// What a callback claims about itself. Checked against the event kind's
/// signature when a descriptor is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// `Some` if the callback only makes sense for one target shape.
    pub target: Option<TargetShape>,
    /// `Some` if the callback reads the relay value as this variant.
    pub relay: Option<RelayKind>,
    pub returns: RelayKinds,
}

impl Signature {
    pub const fn new(relay: Option<RelayKind>, returns: RelayKinds) -> Self {
        Self {
            target: None,
            relay,
            returns,
        }
    }
}

/// Return of an `integer_or_stop` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// No opinion.
    Pass,
    Set(T),
    /// Halt the firing.
    Stop,
}

pub type HandlerFn =
    dyn Fn(&mut BattleState, &EventContext<'_>) -> DispatchResult<RelayValue> + Send + Sync;

/// A handler body together with its declared signature.
#[derive(Clone)]
pub struct Callback {
    signature: Signature,
    func: Arc<HandlerFn>,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl Callback {
    /// A callback with an explicit signature. The body receives the context
    /// untyped and must honor what it declares.
    pub fn raw<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>) -> DispatchResult<RelayValue>
            + Send
            + Sync
            + 'static,
    {
        Self {
            signature,
            func: Arc::new(func),
        }
    }

    /// Restricts the callback to one target shape.
    pub fn on_target(mut self, shape: TargetShape) -> Self {
        self.signature.target = Some(shape);
        self
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn call(&self, battle: &mut BattleState, ctx: &EventContext<'_>) -> DispatchResult<RelayValue> {
        (self.func)(battle, ctx)
    }

    /// Always returns `value`, ignoring the relay.
    pub fn constant(value: RelayValue) -> Self {
        let returns = value.kind().flag();
        Self::raw(Signature::new(None, returns), move |_, _| Ok(value.clone()))
    }

    /// Reads and may replace a decimal modifier.
    pub fn decimal<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, f64) -> DispatchResult<Option<f64>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(Some(RelayKind::Decimal), RelayKinds::ABSENT | RelayKinds::DECIMAL),
            move |battle, ctx| {
                let value = ctx.relay_decimal()?;
                Ok(func(battle, ctx, value)?.map_or(RelayValue::Absent, RelayValue::decimal))
            },
        )
    }

    /// Reads and may replace an integer.
    pub fn integer<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, i32) -> DispatchResult<Option<i32>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(Some(RelayKind::Int), RelayKinds::ABSENT | RelayKinds::INT),
            move |battle, ctx| {
                let value = ctx.relay_int()?;
                Ok(func(battle, ctx, value)?.map_or(RelayValue::Absent, RelayValue::Int))
            },
        )
    }

    /// Reads an integer and may replace it or halt the firing.
    pub fn integer_or_stop<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, i32) -> DispatchResult<Outcome<i32>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(
                Some(RelayKind::Int),
                RelayKinds::ABSENT | RelayKinds::INT | RelayKinds::BOOL,
            ),
            move |battle, ctx| {
                let value = ctx.relay_int()?;
                Ok(match func(battle, ctx, value)? {
                    Outcome::Pass => RelayValue::Absent,
                    Outcome::Set(value) => RelayValue::Int(value),
                    Outcome::Stop => RelayValue::Bool(false),
                })
            },
        )
    }

    /// A yes/no gate that ignores the relay. `Some(false)` vetoes.
    pub fn gate<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>) -> DispatchResult<Option<bool>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(None, RelayKinds::ABSENT | RelayKinds::BOOL),
            move |battle, ctx| Ok(func(battle, ctx)?.map_or(RelayValue::Absent, RelayValue::Bool)),
        )
    }

    /// Side effects only; never changes the relay.
    pub fn action<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>) -> DispatchResult<()> + Send + Sync + 'static,
    {
        Self::raw(Signature::new(None, RelayKinds::ABSENT), move |battle, ctx| {
            func(battle, ctx)?;
            Ok(RelayValue::Absent)
        })
    }

    /// May point the firing at a different creature.
    pub fn redirect<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, PokemonRef) -> DispatchResult<Option<PokemonRef>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(Some(RelayKind::Pokemon), RelayKinds::ABSENT | RelayKinds::POKEMON),
            move |battle, ctx| {
                let current = ctx.relay_pokemon()?;
                Ok(func(battle, ctx, current)?.map_or(RelayValue::Absent, RelayValue::Pokemon))
            },
        )
    }

    pub fn types<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, &[PokemonType]) -> DispatchResult<Option<Vec<PokemonType>>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(Some(RelayKind::Types), RelayKinds::ABSENT | RelayKinds::TYPES),
            move |battle, ctx| {
                let current = ctx.relay_types()?;
                Ok(func(battle, ctx, current)?.map_or(RelayValue::Absent, RelayValue::Types))
            },
        )
    }

    pub fn stats<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, StatTable) -> DispatchResult<Option<StatTable>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(Some(RelayKind::Stats), RelayKinds::ABSENT | RelayKinds::STATS),
            move |battle, ctx| {
                let current = ctx.relay_stats()?;
                Ok(func(battle, ctx, current)?.map_or(RelayValue::Absent, RelayValue::Stats))
            },
        )
    }

    pub fn secondaries<F>(func: F) -> Self
    where
        F: Fn(&mut BattleState, &EventContext<'_>, &[Secondary]) -> DispatchResult<Option<Vec<Secondary>>>
            + Send
            + Sync
            + 'static,
    {
        Self::raw(
            Signature::new(
                Some(RelayKind::Secondaries),
                RelayKinds::ABSENT | RelayKinds::SECONDARIES,
            ),
            move |battle, ctx| {
                let current = ctx.relay_secondaries()?;
                Ok(func(battle, ctx, current)?.map_or(RelayValue::Absent, RelayValue::Secondaries))
            },
        )
    }
}

/// A validated binding of (kind, scope) to a callback.
///
/// Only [`DescriptorBuilder::build`] creates one, so every descriptor in a
/// table agrees with its kind's signature.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    kind: EventKind,
    scope: Scope,
    priority: Option<i32>,
    order: Option<i32>,
    sub_order: Option<i32>,
    uses_speed: bool,
    callback: Callback,
}

impl HandlerDescriptor {
    /// Starts a descriptor with the kind's defaults: `Own` scope, no
    /// priority, order or sub-order, and the kind's speed participation.
    pub fn on(kind: EventKind, callback: Callback) -> DescriptorBuilder {
        DescriptorBuilder {
            kind,
            scope: Scope::Own,
            priority: None,
            order: None,
            sub_order: None,
            uses_speed: kind.signature().uses_speed,
            callback,
        }
    }

    pub fn new(kind: EventKind, scope: Scope, callback: Callback) -> DescriptorResult<Self> {
        Self::on(kind, callback).scope(scope).build()
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn order(&self) -> Option<i32> {
        self.order
    }

    pub fn sub_order(&self) -> Option<i32> {
        self.sub_order
    }

    pub fn uses_speed(&self) -> bool {
        self.uses_speed
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }
}

pub struct DescriptorBuilder {
    kind: EventKind,
    scope: Scope,
    priority: Option<i32>,
    order: Option<i32>,
    sub_order: Option<i32>,
    uses_speed: bool,
    callback: Callback,
}

impl DescriptorBuilder {
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Higher runs first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Lower runs first; takes precedence over priority.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn sub_order(mut self, sub_order: i32) -> Self {
        self.sub_order = Some(sub_order);
        self
    }

    pub fn uses_speed(mut self, uses_speed: bool) -> Self {
        self.uses_speed = uses_speed;
        self
    }

    pub fn build(self) -> DescriptorResult<HandlerDescriptor> {
        let expected = self.kind.signature();
        let declared = self.callback.signature();

        if let Some(reads) = declared.relay {
            if expected.relay != Some(reads) {
                return Err(DescriptorError::RelayParameterMismatch {
                    kind: self.kind,
                    expected: expected.relay,
                    declared: reads,
                });
            }
        }

        if let Some(shape) = declared.target {
            if shape != expected.target {
                return Err(DescriptorError::TargetMismatch {
                    kind: self.kind,
                    expected: expected.target,
                    declared: shape,
                });
            }
        }

        let undeclared = declared.returns.difference(expected.returns);
        if !undeclared.is_empty() {
            return Err(DescriptorError::ReturnMismatch {
                kind: self.kind,
                undeclared,
            });
        }

        Ok(HandlerDescriptor {
            kind: self.kind,
            scope: self.scope,
            priority: self.priority,
            order: self.order,
            sub_order: self.sub_order,
            uses_speed: self.uses_speed,
            callback: self.callback,
        })
    }
}

/// The sparse (kind, scope) -> descriptor map an effect exposes.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<(EventKind, Scope), HandlerDescriptor>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: HandlerDescriptor) -> DescriptorResult<()> {
        let key = (descriptor.kind, descriptor.scope);
        if self.handlers.contains_key(&key) {
            return Err(DescriptorError::DuplicateHandler {
                kind: key.0,
                scope: key.1,
            });
        }
        self.handlers.insert(key, descriptor);
        Ok(())
    }

    /// Builds and inserts in one step, for chaining.
    pub fn with(mut self, descriptor: DescriptorBuilder) -> DescriptorResult<Self> {
        self.insert(descriptor.build()?)?;
        Ok(self)
    }

    pub fn get(&self, kind: EventKind, scope: Scope) -> Option<&HandlerDescriptor> {
        self.handlers.get(&(kind, scope))
    }

    /// Every descriptor for `kind`, in scope declaration order.
    pub fn for_kind(&self, kind: EventKind) -> impl Iterator<Item = &HandlerDescriptor> + '_ {
        Scope::iter().filter_map(move |scope| self.get(kind, scope))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decimal_callback_fits_modify_accuracy() {
        let descriptor = HandlerDescriptor::on(
            EventKind::ModifyAccuracy,
            Callback::decimal(|_, _, acc| Ok(Some(acc * 1.1))),
        )
        .scope(Scope::Foe)
        .priority(1)
        .build()
        .unwrap();

        assert_eq!(descriptor.scope(), Scope::Foe);
        assert_eq!(descriptor.priority(), Some(1));
        assert_eq!(descriptor.order(), None);
        assert!(!descriptor.uses_speed());
    }

    #[test]
    fn test_integer_callback_rejected_for_decimal_kind() {
        let result = HandlerDescriptor::new(
            EventKind::ModifyAccuracy,
            Scope::Own,
            Callback::integer(|_, _, value| Ok(Some(value))),
        );

        assert_eq!(
            result.unwrap_err(),
            DescriptorError::RelayParameterMismatch {
                kind: EventKind::ModifyAccuracy,
                expected: Some(RelayKind::Decimal),
                declared: RelayKind::Int,
            }
        );
    }

    #[test]
    fn test_gate_rejected_for_modifier_kind() {
        // BasePower never yields a bool, so a gate cannot bind to it.
        let result = HandlerDescriptor::new(
            EventKind::BasePower,
            Scope::Own,
            Callback::gate(|_, _| Ok(Some(false))),
        );

        assert_eq!(
            result.unwrap_err(),
            DescriptorError::ReturnMismatch {
                kind: EventKind::BasePower,
                undeclared: RelayKinds::BOOL,
            }
        );
    }

    #[test]
    fn test_target_shape_mismatch() {
        let result = HandlerDescriptor::new(
            EventKind::SideResidual,
            Scope::Own,
            Callback::action(|_, _| Ok(())).on_target(TargetShape::Pokemon),
        );

        assert!(matches!(
            result,
            Err(DescriptorError::TargetMismatch {
                expected: TargetShape::Side,
                declared: TargetShape::Pokemon,
                ..
            })
        ));
    }

    #[test]
    fn test_constant_callback_declares_its_variant() {
        let ok = HandlerDescriptor::new(
            EventKind::ModifyStab,
            Scope::Own,
            Callback::constant(RelayValue::decimal(2.0)),
        );
        assert!(ok.is_ok());

        let wrong = HandlerDescriptor::new(
            EventKind::ModifyStab,
            Scope::Own,
            Callback::constant(RelayValue::Int(2)),
        );
        assert!(matches!(wrong, Err(DescriptorError::ReturnMismatch { .. })));
    }

    #[test]
    fn test_speed_default_follows_kind() {
        let descriptor = HandlerDescriptor::on(
            EventKind::BeforeMove,
            Callback::gate(|_, _| Ok(None)),
        )
        .build()
        .unwrap();
        assert!(descriptor.uses_speed());

        let overridden = HandlerDescriptor::on(
            EventKind::BeforeMove,
            Callback::gate(|_, _| Ok(None)),
        )
        .uses_speed(false)
        .build()
        .unwrap();
        assert!(!overridden.uses_speed());
    }

    #[test]
    fn test_table_rejects_duplicate_key() {
        let table = HandlerTable::new()
            .with(HandlerDescriptor::on(EventKind::Residual, Callback::action(|_, _| Ok(()))))
            .unwrap();

        let err = table
            .with(HandlerDescriptor::on(EventKind::Residual, Callback::action(|_, _| Ok(()))))
            .unwrap_err();
        assert_eq!(
            err,
            DescriptorError::DuplicateHandler {
                kind: EventKind::Residual,
                scope: Scope::Own,
            }
        );
    }

    #[test]
    fn test_for_kind_yields_scopes_in_order() {
        let table = HandlerTable::new()
            .with(
                HandlerDescriptor::on(EventKind::ModifyAtk, Callback::integer(|_, _, _| Ok(None)))
                    .scope(Scope::Any),
            )
            .unwrap()
            .with(
                HandlerDescriptor::on(EventKind::ModifyAtk, Callback::integer(|_, _, _| Ok(None)))
                    .scope(Scope::Ally),
            )
            .unwrap();

        let scopes: Vec<Scope> = table.for_kind(EventKind::ModifyAtk).map(|d| d.scope()).collect();
        assert_eq!(scopes, vec![Scope::Ally, Scope::Any]);
        assert_eq!(table.len(), 2);
    }
}
