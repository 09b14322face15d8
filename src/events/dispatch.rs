//! Handler collection, ordering and relay threading.
//!
//! A firing collects every qualifying descriptor from the attached effect
//! sources, sorts them by a total key, then threads the relay value through
//! them one at a time. Each handler gets `&mut BattleState`, so the callback
//! list is cloned out of the graph before the first call.

use super::context::{EventContext, EventTarget, Holder};
use super::descriptor::{Callback, HandlerDescriptor, Scope};
use super::kind::EventKind;
use super::relay::{RelayKind, RelayValue};
use crate::battle::commands::end_effect;
use crate::battle::state::BattleState;
use crate::effects::{EffectId, EffectKind, EffectSource};
use crate::errors::{DispatchError, DispatchResult};
use crate::pokemon::PokemonRef;
use schema::SideId;
use std::cmp::Reverse;
use tracing::{debug, error, trace};

/// The optional parts of a firing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireOptions<'a> {
    pub source: Option<PokemonRef>,
    pub source_effect: Option<&'a EffectId>,
    /// Run the source effect's own `Own` handler for this kind ahead of
    /// everything attached, looked up in the catalog.
    pub on_effect: bool,
    /// Stop at the first handler that returns anything but `Absent`.
    pub fast_exit: bool,
}

impl<'a> FireOptions<'a> {
    pub fn from_source(source: Option<PokemonRef>, source_effect: Option<&'a EffectId>) -> Self {
        Self {
            source,
            source_effect,
            ..Self::default()
        }
    }
}

/// A descriptor resolved against the board, ready to sort and call.
#[derive(Debug, Clone)]
struct ResolvedHandler {
    holder: Holder,
    effect: EffectId,
    effect_kind: EffectKind,
    effect_order: u64,
    scope: Scope,
    order: Option<i32>,
    priority: i32,
    speed: u32,
    uses_speed: bool,
    sub_order: i32,
    /// Unattached handlers (catalog lookups) skip the liveness checks.
    attached: bool,
    callback: Option<Callback>,
}

type SortKey = ((u8, i32), Reverse<i32>, Reverse<u32>, i32, u64, Scope);

impl ResolvedHandler {
    fn new(
        battle: &BattleState,
        holder: Holder,
        source: &EffectSource,
        descriptor: Option<&HandlerDescriptor>,
        default_speed: bool,
    ) -> Self {
        Self {
            holder,
            effect: source.id.clone(),
            effect_kind: source.kind,
            effect_order: source.state.effect_order,
            scope: descriptor.map_or(Scope::Own, HandlerDescriptor::scope),
            order: descriptor.and_then(HandlerDescriptor::order),
            priority: descriptor.and_then(HandlerDescriptor::priority).unwrap_or(0),
            speed: holder_speed(battle, holder),
            uses_speed: descriptor.map_or(default_speed, HandlerDescriptor::uses_speed),
            sub_order: descriptor
                .and_then(HandlerDescriptor::sub_order)
                .unwrap_or_else(|| source.kind.default_sub_order()),
            attached: true,
            callback: descriptor.map(|d| d.callback().clone()),
        }
    }

    /// Explicit order first (present before absent), priority and speed
    /// descending, then sub-order and registration sequence ascending. The
    /// key is total, so equal handlers always land in registration order.
    fn sort_key(&self) -> SortKey {
        let order = match self.order {
            Some(order) => (0, order),
            None => (1, 0),
        };
        let speed = if self.uses_speed { self.speed } else { 0 };
        (
            order,
            Reverse(self.priority),
            Reverse(speed),
            self.sub_order,
            self.effect_order,
            self.scope,
        )
    }
}

/// Whose perspective an attached source is judged from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Pokemon(PokemonRef),
    Side(SideId),
    Global,
}

fn owner_of(battle: &BattleState, holder: Holder) -> Owner {
    match holder {
        Holder::Pokemon(pokemon) | Holder::ActiveMove(pokemon) => Owner::Pokemon(pokemon),
        Holder::Slot { side, slot } => battle
            .occupant(side, slot)
            .map_or(Owner::Side(side), Owner::Pokemon),
        Holder::Side(side) => Owner::Side(side),
        Holder::Field | Holder::Format => Owner::Global,
    }
}

fn holder_speed(battle: &BattleState, holder: Holder) -> u32 {
    match owner_of(battle, holder) {
        Owner::Pokemon(pokemon) => battle.pokemon(pokemon).map_or(0, |p| p.speed_stat()),
        Owner::Side(_) | Owner::Global => 0,
    }
}

/// Whether a descriptor with `scope`, held by `holder`, takes part in a
/// firing at `target`.
fn qualifies(
    battle: &BattleState,
    holder: Holder,
    scope: Scope,
    target: EventTarget,
    source: Option<PokemonRef>,
) -> bool {
    if scope == Scope::Any {
        return true;
    }
    // The executing move speaks for whatever it is aimed at.
    if matches!(holder, Holder::ActiveMove(_)) && scope == Scope::Own {
        return true;
    }

    match owner_of(battle, holder) {
        Owner::Pokemon(owner) => match scope {
            Scope::Own => target.pokemon() == Some(owner),
            Scope::Ally => target.side() == Some(owner.side) && target.pokemon() != Some(owner),
            Scope::Foe => target.side() == Some(owner.side.foe()),
            Scope::Source => source == Some(owner),
            Scope::Any => true,
        },
        Owner::Side(side) => match scope {
            Scope::Own => target.side() == Some(side),
            Scope::Ally => false,
            Scope::Foe => target.side() == Some(side.foe()),
            Scope::Source => source.is_some_and(|s| s.side == side),
            Scope::Any => true,
        },
        Owner::Global => match scope {
            Scope::Own | Scope::Any => true,
            Scope::Ally | Scope::Foe => false,
            Scope::Source => source.is_some(),
        },
    }
}

fn check_target(battle: &BattleState, kind: EventKind, target: EventTarget) -> DispatchResult<()> {
    let expected = kind.signature().target;
    if target.shape() != expected {
        error!(%kind, ?target, "event fired at the wrong target shape");
        return Err(DispatchError::TargetShapeMismatch {
            kind,
            expected,
            found: target.shape(),
        });
    }
    if let Some(pokemon) = target.pokemon() {
        if battle.pokemon(pokemon).is_none() {
            return Err(DispatchError::UnknownCreature(pokemon));
        }
    }
    Ok(())
}

fn check_relay(kind: EventKind, relay: &RelayValue) -> DispatchResult<()> {
    let expected = kind.signature().relay;
    let found = relay.kind();
    let matches = match expected {
        Some(expected) => expected == found,
        None => found == RelayKind::Absent,
    };
    if matches {
        Ok(())
    } else {
        error!(%kind, %found, "initial relay does not match the event kind");
        Err(DispatchError::RelayTypeMismatch {
            kind,
            expected,
            found,
        })
    }
}

/// The initial relay value a kind starts from when the caller has nothing
/// more specific.
pub fn default_relay(kind: EventKind) -> RelayValue {
    match kind.signature().relay {
        Some(RelayKind::Bool) => RelayValue::Bool(true),
        Some(RelayKind::Int) => RelayValue::Int(0),
        Some(RelayKind::Decimal) => RelayValue::decimal(1.0),
        _ => RelayValue::Absent,
    }
}

fn collect_handlers(
    battle: &BattleState,
    kind: EventKind,
    target: EventTarget,
    source: Option<PokemonRef>,
) -> Vec<ResolvedHandler> {
    let default_speed = kind.signature().uses_speed;
    let mut handlers: Vec<ResolvedHandler> = battle
        .attached_sources()
        .into_iter()
        .flat_map(|(holder, effect)| {
            effect
                .handlers
                .for_kind(kind)
                .filter(move |d| qualifies(battle, holder, d.scope(), target, source))
                .map(move |d| ResolvedHandler::new(battle, holder, effect, Some(d), default_speed))
        })
        .collect();
    handlers.sort_by_key(ResolvedHandler::sort_key);
    handlers
}

/// Looks up the source effect's own handler in the catalog.
fn on_effect_handler(
    battle: &BattleState,
    kind: EventKind,
    options: &FireOptions<'_>,
) -> Option<ResolvedHandler> {
    let effect = options.source_effect?;
    let table = battle.catalog.handlers(effect)?;
    let descriptor = table.get(kind, Scope::Own)?;
    let holder = options.source.map_or(Holder::Field, Holder::ActiveMove);
    Some(ResolvedHandler {
        holder,
        effect: effect.clone(),
        effect_kind: EffectKind::ActiveMove,
        effect_order: 0,
        scope: Scope::Own,
        order: descriptor.order(),
        priority: descriptor.priority().unwrap_or(0),
        speed: holder_speed(battle, holder),
        uses_speed: descriptor.uses_speed(),
        sub_order: descriptor.sub_order().unwrap_or(0),
        attached: false,
        callback: Some(descriptor.callback().clone()),
    })
}

fn enter(battle: &mut BattleState, kind: EventKind) -> DispatchResult<()> {
    if battle.event_depth >= battle.config.max_event_depth {
        error!(%kind, depth = battle.event_depth, "event recursion limit hit");
        return Err(DispatchError::DepthExceeded {
            kind,
            depth: battle.event_depth + 1,
        });
    }
    battle.event_depth += 1;
    Ok(())
}

/// Calls `handlers` in order, threading the relay.
fn thread(
    battle: &mut BattleState,
    kind: EventKind,
    target: EventTarget,
    options: &FireOptions<'_>,
    handlers: Vec<ResolvedHandler>,
    mut relay: RelayValue,
) -> DispatchResult<RelayValue> {
    let signature = kind.signature();

    for handler in handlers {
        let Some(callback) = handler.callback.as_ref() else {
            continue;
        };

        if handler.attached {
            // An earlier handler in this firing may have removed the source.
            if battle.find_source(handler.holder, handler.effect_order).is_none() {
                debug!(%kind, effect = %handler.effect, holder = %handler.holder, "skipping detached source");
                continue;
            }
            if let Holder::Pokemon(pokemon) = handler.holder {
                if !battle.is_on_field(pokemon) {
                    error!(%kind, holder = %pokemon, "holder left the field mid-firing");
                    return Err(DispatchError::HolderLeftField {
                        kind,
                        holder: pokemon,
                    });
                }
            }
            if battle.is_suppressed(handler.holder, handler.effect_kind) {
                debug!(%kind, effect = %handler.effect, "handler suppressed");
                continue;
            }
        }

        let result = {
            let ctx = EventContext {
                kind,
                target,
                source: options.source,
                source_effect: options.source_effect,
                relay: &relay,
                holder: handler.holder,
                effect: &handler.effect,
                effect_kind: handler.effect_kind,
                effect_order: handler.effect_order,
            };
            trace!(
                event = %kind.prefixed(handler.scope),
                effect = %handler.effect,
                holder = %handler.holder,
                "calling handler"
            );
            callback.call(battle, &ctx)?
        };

        if !signature.returns.contains(result.kind().flag()) {
            error!(%kind, effect = %handler.effect, returned = %result.kind(), "undeclared relay variant");
            return Err(DispatchError::UndeclaredRelay {
                kind,
                effect: handler.effect,
                returned: result.kind(),
            });
        }
        if signature.veto.halts(&result) {
            debug!(%kind, effect = %handler.effect, "firing halted");
            return Ok(result);
        }
        if result.is_absent() {
            continue;
        }
        relay = result;
        if options.fast_exit {
            break;
        }
    }

    Ok(relay)
}

fn fire(
    battle: &mut BattleState,
    kind: EventKind,
    target: EventTarget,
    options: &FireOptions<'_>,
    handlers: Vec<ResolvedHandler>,
    relay: RelayValue,
) -> DispatchResult<RelayValue> {
    enter(battle, kind)?;
    let result = thread(battle, kind, target, options, handlers, relay);
    battle.event_depth -= 1;
    result
}

/// Fires `kind` at `target` through every qualifying attached handler.
pub fn run_event(
    battle: &mut BattleState,
    kind: EventKind,
    target: impl Into<EventTarget>,
    source: Option<PokemonRef>,
    source_effect: Option<&EffectId>,
    relay: RelayValue,
) -> DispatchResult<RelayValue> {
    run_event_with(battle, kind, target, relay, &FireOptions::from_source(source, source_effect))
}

pub fn run_event_with(
    battle: &mut BattleState,
    kind: EventKind,
    target: impl Into<EventTarget>,
    relay: RelayValue,
    options: &FireOptions<'_>,
) -> DispatchResult<RelayValue> {
    let target = target.into();
    check_target(battle, kind, target)?;
    check_relay(kind, &relay)?;

    let mut handlers = collect_handlers(battle, kind, target, options.source);
    if options.on_effect {
        if let Some(own) = on_effect_handler(battle, kind, options) {
            handlers.insert(0, own);
        }
    }
    debug!(%kind, ?target, handlers = handlers.len(), "firing");
    fire(battle, kind, target, options, handlers, relay)
}

/// Like [`run_event`], but the first handler with an opinion decides.
pub fn priority_event(
    battle: &mut BattleState,
    kind: EventKind,
    target: impl Into<EventTarget>,
    source: Option<PokemonRef>,
    relay: RelayValue,
) -> DispatchResult<RelayValue> {
    let options = FireOptions {
        source,
        fast_exit: true,
        ..FireOptions::default()
    };
    run_event_with(battle, kind, target, relay, &options)
}

/// Fires `kind` on one attached source only, using its `Own` handler. A
/// source that is gone or has no such handler leaves the relay unchanged.
pub fn single_event(
    battle: &mut BattleState,
    kind: EventKind,
    holder: Holder,
    effect_order: u64,
    source: Option<PokemonRef>,
    source_effect: Option<&EffectId>,
    relay: RelayValue,
) -> DispatchResult<RelayValue> {
    check_relay(kind, &relay)?;
    let Some(effect) = battle.find_source(holder, effect_order) else {
        debug!(%kind, %holder, effect_order, "single event on a missing source");
        return Ok(relay);
    };
    let Some(descriptor) = effect.handlers.get(kind, Scope::Own) else {
        return Ok(relay);
    };

    let handler = ResolvedHandler::new(battle, holder, effect, Some(descriptor), false);
    let target = match holder {
        Holder::Slot { side, slot } => holder.as_target(battle.occupant(side, slot)),
        _ => holder.as_target(None),
    };
    check_target(battle, kind, target)?;
    fire(
        battle,
        kind,
        target,
        &FireOptions::from_source(source, source_effect),
        vec![handler],
        relay,
    )
}

/// Fires the catalog entry of an effect that is not attached anywhere, such
/// as a move's own priority hook while turn order is being worked out.
pub fn catalog_event(
    battle: &mut BattleState,
    kind: EventKind,
    effect: &EffectId,
    user: PokemonRef,
    relay: RelayValue,
) -> DispatchResult<RelayValue> {
    let options = FireOptions {
        source: Some(user),
        source_effect: Some(effect),
        on_effect: true,
        fast_exit: false,
    };
    check_target(battle, kind, user.into())?;
    check_relay(kind, &relay)?;
    match on_effect_handler(battle, kind, &options) {
        Some(handler) => fire(battle, kind, user.into(), &options, vec![handler], relay),
        None => Ok(relay),
    }
}

/// Active creatures, fastest first; ties by side then slot.
pub fn speed_order(battle: &BattleState) -> Vec<PokemonRef> {
    let mut actives: Vec<(u32, SideId, usize, PokemonRef)> = battle
        .active_alive()
        .into_iter()
        .map(|pokemon| {
            let speed = battle.pokemon(pokemon).map_or(0, |p| p.speed_stat());
            let slot = battle.slot_of(pokemon).unwrap_or(usize::MAX);
            (speed, pokemon.side, slot, pokemon)
        })
        .collect();
    actives.sort_by_key(|(speed, side, slot, _)| (Reverse(*speed), *side, *slot));
    actives.into_iter().map(|(.., pokemon)| pokemon).collect()
}

/// Fires a void `kind` once at each active creature in speed order.
pub fn each_event(battle: &mut BattleState, kind: EventKind) -> DispatchResult<()> {
    for pokemon in speed_order(battle) {
        // An earlier firing may have knocked this one out.
        if battle.pokemon(pokemon).is_some_and(|p| p.is_fainted()) {
            continue;
        }
        run_event(battle, kind, pokemon, None, None, RelayValue::Absent)?;
    }
    Ok(())
}

struct ResidualEntry {
    handler: ResolvedHandler,
    kind: EventKind,
    target: EventTarget,
}

/// End-of-turn pass over every attached source, ordered as one list.
///
/// Each source with a duration is ticked; one that reaches zero ends (its
/// `End` fires and it is detached) instead of running its residual
/// handler. Fainted holders and sources removed earlier in the pass are
/// skipped.
pub fn field_event(battle: &mut BattleState) -> DispatchResult<()> {
    let mut entries: Vec<ResidualEntry> = Vec::new();
    for (holder, effect) in battle.attached_sources() {
        let occupant = match holder {
            Holder::Slot { side, slot } => battle.occupant(side, slot),
            _ => None,
        };
        let target = holder.as_target(occupant);
        let Some(kind) = EventKind::residual_for(target.shape()) else {
            continue;
        };
        let descriptor = effect.handlers.get(kind, Scope::Own);
        if descriptor.is_none() && effect.state.duration.is_none() {
            continue;
        }
        entries.push(ResidualEntry {
            handler: ResolvedHandler::new(battle, holder, effect, descriptor, kind.signature().uses_speed),
            kind,
            target,
        });
    }
    entries.sort_by_key(|entry| entry.handler.sort_key());
    debug!(entries = entries.len(), "residual pass");

    for entry in entries {
        let ResidualEntry {
            handler,
            kind,
            target,
        } = entry;
        let holder = handler.holder;
        let effect_order = handler.effect_order;

        let Some(effect) = battle.find_source_mut(holder, effect_order) else {
            debug!(effect = %handler.effect, "source ended earlier in the pass");
            continue;
        };
        if let Some(turns) = effect.state.duration.as_mut() {
            *turns = turns.saturating_sub(1);
            if *turns == 0 {
                end_effect(battle, holder, effect_order)?;
                continue;
            }
        }

        if let Holder::Pokemon(pokemon) = holder {
            if battle.pokemon(pokemon).map_or(true, |p| p.is_fainted()) {
                continue;
            }
        }
        fire(
            battle,
            kind,
            target,
            &FireOptions::default(),
            vec![handler],
            RelayValue::Absent,
        )?;
    }
    Ok(())
}

/// The order a firing would call its handlers in, without calling them.
pub fn handler_order(
    battle: &BattleState,
    kind: EventKind,
    target: impl Into<EventTarget>,
    source: Option<PokemonRef>,
) -> DispatchResult<Vec<(Holder, EffectId, Scope)>> {
    let target = target.into();
    check_target(battle, kind, target)?;
    Ok(collect_handlers(battle, kind, target, source)
        .into_iter()
        .map(|h| (h.holder, h.effect, h.scope))
        .collect())
}
