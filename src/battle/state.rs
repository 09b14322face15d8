use crate::choices::Choice;
use crate::config::EngineConfig;
use crate::effects::{EffectCatalog, EffectId, EffectKind, EffectSource};
use crate::errors::{DispatchError, DispatchResult};
use crate::events::Holder;
use crate::moves::{MoveId, MoveLibrary};
use crate::pokemon::{PokemonInst, PokemonRef};
use crate::side::Side;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{GameType, PokemonType, SideId, StatType};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Copy)]
pub enum GameState {
    TeamPreview,
    WaitingForActions,
    WaitingForSwitches, // At least one side must replace a fainted creature
    TurnInProgress,
    Won(SideId),
    Draw,
    Aborted { forfeited: Option<SideId> },
}

impl GameState {
    pub fn is_finished(self) -> bool {
        matches!(self, GameState::Won(_) | GameState::Draw | GameState::Aborted { .. })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    // Battle flow
    BattleStarted {
        game_type: GameType,
    },
    TeamOrderChosen {
        side: SideId,
        order: Vec<usize>,
    },
    TurnStarted {
        turn_number: u32,
    },
    TurnEnded,

    // Creature actions
    PokemonSwitchedIn {
        pokemon: PokemonRef,
        slot: usize,
    },
    PokemonSwitchedOut {
        pokemon: PokemonRef,
        slot: usize,
    },
    MoveUsed {
        pokemon: PokemonRef,
        move_used: MoveId,
    },
    MoveMissed {
        attacker: PokemonRef,
        defender: PokemonRef,
        move_used: MoveId,
    },
    MoveBlocked {
        attacker: PokemonRef,
        defender: PokemonRef,
        move_used: MoveId,
    },
    MoveHadNoEffect {
        attacker: PokemonRef,
        defender: PokemonRef,
        move_used: MoveId,
    },
    CriticalHit {
        target: PokemonRef,
    },
    Terastallized {
        pokemon: PokemonRef,
        tera_type: PokemonType,
    },
    DamageDealt {
        target: PokemonRef,
        damage: u16,
        remaining_hp: u16,
    },
    PokemonHealed {
        target: PokemonRef,
        amount: u16,
        new_hp: u16,
    },
    PokemonFainted {
        pokemon: PokemonRef,
    },

    // Effects
    StatusApplied {
        target: PokemonRef,
        status: EffectId,
    },
    StatusCured {
        target: PokemonRef,
        status: EffectId,
    },
    VolatileAdded {
        target: PokemonRef,
        effect: EffectId,
    },
    VolatileRemoved {
        target: PokemonRef,
        effect: EffectId,
    },
    SideConditionStarted {
        side: SideId,
        condition: EffectId,
    },
    FieldEffectStarted {
        effect: EffectId,
    },
    ConditionExpired {
        holder: Holder,
        effect: EffectId,
    },
    EffectActivated {
        holder: Holder,
        effect: EffectId,
    },
    StatStageChanged {
        target: PokemonRef,
        stat: StatType,
        old_stage: i8,
        new_stage: i8,
    },

    ActionFailed {
        pokemon: PokemonRef,
        reason: ActionFailureReason,
    },

    // Decision boundary
    ChoiceSubstituted {
        side: SideId,
    },

    // Battle end
    PlayerDefeated {
        side: SideId,
    },
    BattleEnded {
        winner: Option<SideId>,
    },
    BattleAborted {
        reason: String,
    },
}

impl BattleEvent {
    /// Formats the event into a human-readable string using battle context.
    /// Returns None for silent events that should not produce user-visible text.
    pub fn format(&self, battle_state: &BattleState) -> Option<String> {
        let name = |pokemon: &PokemonRef| battle_state.pokemon_name(*pokemon);
        let player = |side: &SideId| battle_state.side(*side).player_name.clone();

        match self {
            BattleEvent::BattleStarted { game_type } => Some(format!("A {} battle begins!", game_type)),
            BattleEvent::TeamOrderChosen { .. } => None,
            BattleEvent::TurnStarted { turn_number } => Some(format!("=== Turn {} ===", turn_number)),
            BattleEvent::TurnEnded => None,

            BattleEvent::PokemonSwitchedIn { pokemon, .. } => Some(format!(
                "{} sent out {}!",
                player(&pokemon.side),
                name(pokemon)
            )),
            BattleEvent::PokemonSwitchedOut { pokemon, .. } => Some(format!(
                "{} withdrew {}!",
                player(&pokemon.side),
                name(pokemon)
            )),
            BattleEvent::MoveUsed { pokemon, move_used } => Some(format!(
                "{} used {}!",
                name(pokemon),
                battle_state.move_name(move_used)
            )),
            BattleEvent::MoveMissed { attacker, .. } => Some(format!("{}'s attack missed!", name(attacker))),
            BattleEvent::MoveBlocked { defender, .. } => Some(format!("{} protected itself!", name(defender))),
            BattleEvent::MoveHadNoEffect { defender, .. } => {
                Some(format!("It doesn't affect {}...", name(defender)))
            }
            BattleEvent::CriticalHit { .. } => Some("A critical hit!".to_string()),
            BattleEvent::Terastallized { pokemon, tera_type } => Some(format!(
                "{} terastallized into the {} type!",
                name(pokemon),
                tera_type
            )),
            BattleEvent::DamageDealt { target, damage, .. } => {
                Some(format!("{} took {} damage!", name(target), damage))
            }
            BattleEvent::PokemonHealed { target, amount, .. } => {
                Some(format!("{} recovered {} HP!", name(target), amount))
            }
            BattleEvent::PokemonFainted { pokemon } => Some(format!("{} fainted!", name(pokemon))),

            BattleEvent::StatusApplied { target, status } => {
                Some(format!("{} was afflicted with {}!", name(target), status))
            }
            BattleEvent::StatusCured { target, status } => {
                Some(format!("{} was cured of {}!", name(target), status))
            }
            BattleEvent::VolatileAdded { target, effect } => {
                Some(format!("{} is affected by {}!", name(target), effect))
            }
            BattleEvent::VolatileRemoved { target, effect } => {
                Some(format!("{} is no longer affected by {}.", name(target), effect))
            }
            BattleEvent::SideConditionStarted { side, condition } => {
                Some(format!("{} now protects {}'s team!", condition, player(side)))
            }
            BattleEvent::FieldEffectStarted { effect } => Some(format!("{} took hold of the field!", effect)),
            BattleEvent::ConditionExpired { effect, .. } => Some(format!("{} wore off.", effect)),
            BattleEvent::EffectActivated { .. } => None,
            BattleEvent::StatStageChanged {
                target,
                stat,
                old_stage,
                new_stage,
            } => {
                let verb = match new_stage - old_stage {
                    0 if *new_stage >= 6 => "won't go any higher",
                    0 => "won't go any lower",
                    d if d >= 2 => "rose sharply",
                    d if d > 0 => "rose",
                    d if d <= -2 => "fell harshly",
                    _ => "fell",
                };
                Some(format!("{}'s {} {}!", name(target), stat, verb))
            }
            BattleEvent::ActionFailed { pokemon, reason } => {
                Some(format!("{} couldn't act: {}", name(pokemon), reason))
            }
            BattleEvent::ChoiceSubstituted { side } => {
                Some(format!("{} ran out of time; a default action was chosen.", player(side)))
            }
            BattleEvent::PlayerDefeated { side } => Some(format!("{} is out of usable Pokemon!", player(side))),
            BattleEvent::BattleEnded { winner } => Some(match winner {
                Some(side) => format!("{} won the battle!", player(side)),
                None => "The battle ended in a draw!".to_string(),
            }),
            BattleEvent::BattleAborted { reason } => Some(format!("The battle was stopped: {}", reason)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFailureReason {
    Blocked, // a BeforeMove or TryMove handler closed the gate
    NoTarget,
    NoPPRemaining,
    MoveFailedToExecute,
}

impl fmt::Display for ActionFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionFailureReason::Blocked => "it was stopped",
            ActionFailureReason::NoTarget => "there was no target",
            ActionFailureReason::NoPPRemaining => "no PP left",
            ActionFailureReason::MoveFailedToExecute => "the move failed",
        };
        write!(f, "{}", text)
    }
}

/// Ordered, replayable log of battle events.
///
/// ```rust,ignore
/// event_bus.print_formatted(&battle_state);
/// let blob = event_bus.to_replay_bytes()?;
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn extend(&mut self, other: EventBus) {
        self.events.extend(other.events);
    }

    /// Print all events using their formatted text; silent events are skipped.
    pub fn print_formatted(&self, battle_state: &BattleState) {
        for line in self.formatted(battle_state) {
            println!("  {}", line);
        }
    }

    pub fn formatted(&self, battle_state: &BattleState) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.format(battle_state))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Compact binary form for storing a replay.
    pub fn to_replay_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_replay_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

/// Battle randomness. Scripted outcomes are consumed first, which lets
/// tests pin every roll; after that a seeded generator takes over.
#[derive(Debug, Clone)]
pub struct TurnRng {
    scripted: VecDeque<u8>,
    rng: StdRng,
}

impl TurnRng {
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            scripted: outcomes.into(),
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            scripted: VecDeque::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn new_random() -> Self {
        Self {
            scripted: VecDeque::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// A roll in 1..=100.
    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        let outcome = match self.scripted.pop_front() {
            Some(outcome) => outcome,
            None => self.rng.random_range(1..=100),
        };
        trace!(outcome, reason, "rng consumed");
        outcome
    }

    /// An index in 0..len. `len` must be non-zero.
    pub fn pick(&mut self, len: usize, reason: &str) -> usize {
        let roll = usize::from(self.next_outcome(reason));
        roll.saturating_sub(1) % len.max(1)
    }
}

/// Effects that sit on the whole field.
#[derive(Debug, Clone, Default)]
pub struct Field {
    pub weather: Option<EffectSource>,
    pub terrain: Option<EffectSource>,
    pub pseudo_weather: Vec<EffectSource>,
}

impl Field {
    pub fn attached(&self) -> impl Iterator<Item = &EffectSource> {
        self.weather
            .iter()
            .chain(self.terrain.iter())
            .chain(self.pseudo_weather.iter())
    }

    pub fn has_weather(&self, id: &EffectId) -> bool {
        self.weather.as_ref().is_some_and(|w| &w.id == id)
    }
}

/// The move currently executing.
#[derive(Debug, Clone)]
pub struct ActiveMove {
    pub id: MoveId,
    pub user: PokemonRef,
    pub source: Option<EffectSource>,
}

pub struct BattleState {
    pub battle_id: String,
    pub game_type: GameType,
    pub sides: [Side; 2],
    pub field: Field,
    pub format: Option<EffectSource>,
    pub active_move: Option<ActiveMove>,
    pub turn_number: u32,
    pub game_state: GameState,
    /// Set once the start-of-battle announcements have run.
    pub started: bool,
    pub action_queue: [Option<Choice>; 2],
    pub moves: Arc<MoveLibrary>,
    pub catalog: Arc<dyn EffectCatalog>,
    pub config: EngineConfig,
    pub log: EventBus,
    pub rng: TurnRng,
    effect_counter: u64,
    pub(crate) event_depth: usize,
}

impl fmt::Debug for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleState")
            .field("battle_id", &self.battle_id)
            .field("game_type", &self.game_type)
            .field("turn_number", &self.turn_number)
            .field("game_state", &self.game_state)
            .field("sides", &self.sides)
            .finish_non_exhaustive()
    }
}

impl BattleState {
    pub fn new(
        id: impl Into<String>,
        game_type: GameType,
        mut player1: Side,
        mut player2: Side,
        moves: Arc<MoveLibrary>,
        catalog: Arc<dyn EffectCatalog>,
    ) -> Self {
        let slots = game_type.active_slots();
        player1.id = SideId::P1;
        player2.id = SideId::P2;
        for side in [&mut player1, &mut player2] {
            side.active = vec![None; slots];
            side.slot_conditions = vec![Vec::new(); slots];
        }

        let config = EngineConfig::default();
        let mut battle = Self {
            battle_id: id.into(),
            game_type,
            sides: [player1, player2],
            field: Field::default(),
            format: None,
            active_move: None,
            turn_number: 1,
            game_state: GameState::TeamPreview,
            started: false,
            action_queue: [None, None],
            moves,
            catalog,
            rng: config.seed.map_or_else(TurnRng::new_random, TurnRng::seeded),
            config,
            log: EventBus::new(),
            effect_counter: 0,
            event_depth: 0,
        };
        battle.number_roster_sources();
        battle
    }

    /// Abilities and items arrive on the roster unnumbered.
    fn number_roster_sources(&mut self) {
        let mut counter = self.effect_counter;
        for side in &mut self.sides {
            for pokemon in &mut side.roster {
                for source in pokemon.attached_mut() {
                    counter += 1;
                    source.state.effect_order = counter;
                }
            }
        }
        self.effect_counter = counter;
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if let Some(seed) = config.seed {
            self.rng = TurnRng::seeded(seed);
        }
        self.config = config;
        self
    }

    pub fn with_rng(mut self, rng: TurnRng) -> Self {
        self.rng = rng;
        self
    }

    /// Attaches the format's rule handlers.
    pub fn with_format(mut self, format: EffectSource) -> Self {
        self.attach(Holder::Format, format);
        self
    }

    // --- Board lookups ---

    pub fn side(&self, id: SideId) -> &Side {
        &self.sides[id.index()]
    }

    pub fn side_mut(&mut self, id: SideId) -> &mut Side {
        &mut self.sides[id.index()]
    }

    pub fn pokemon(&self, pokemon: PokemonRef) -> Option<&PokemonInst> {
        self.side(pokemon.side).pokemon(pokemon.index)
    }

    pub fn pokemon_mut(&mut self, pokemon: PokemonRef) -> Option<&mut PokemonInst> {
        self.side_mut(pokemon.side).pokemon_mut(pokemon.index)
    }

    pub fn pokemon_name(&self, pokemon: PokemonRef) -> String {
        self.pokemon(pokemon)
            .map_or_else(|| pokemon.to_string(), |p| p.name.clone())
    }

    pub fn move_name(&self, id: &MoveId) -> String {
        self.moves.get(id).map_or_else(|| id.to_string(), |m| m.name.clone())
    }

    /// Whether the creature occupies an active slot (fainted or not).
    pub fn is_on_field(&self, pokemon: PokemonRef) -> bool {
        self.pokemon(pokemon)
            .and_then(|p| p.position)
            .is_some_and(|slot| self.side(pokemon.side).occupant(slot) == Some(pokemon.index))
    }

    pub fn slot_of(&self, pokemon: PokemonRef) -> Option<usize> {
        self.side(pokemon.side).slot_of(pokemon.index)
    }

    pub fn occupant(&self, side: SideId, slot: usize) -> Option<PokemonRef> {
        self.side(side)
            .occupant(slot)
            .map(|index| PokemonRef::new(side, index))
    }

    /// Every active creature, P1 slots then P2 slots.
    pub fn active_refs(&self) -> Vec<PokemonRef> {
        self.sides.iter().flat_map(|side| side.active_refs()).collect()
    }

    /// Active creatures that have not fainted.
    pub fn active_alive(&self) -> Vec<PokemonRef> {
        self.active_refs()
            .into_iter()
            .filter(|r| self.pokemon(*r).is_some_and(|p| !p.is_fainted()))
            .collect()
    }

    /// Adjacency between two active slots, across or within sides.
    pub fn is_adjacent(&self, a: PokemonRef, b: PokemonRef) -> bool {
        match (self.slot_of(a), self.slot_of(b)) {
            (Some(slot_a), Some(slot_b)) => {
                slots_adjacent(a.side, slot_a, b.side, slot_b, self.game_type.active_slots())
            }
            _ => false,
        }
    }

    // --- Effect attachment ---

    fn next_effect_order(&mut self) -> u64 {
        self.effect_counter += 1;
        self.effect_counter
    }

    /// Numbers `source` and places it under `holder`. Returns its
    /// registration sequence and any source it displaced.
    pub fn attach(&mut self, holder: Holder, mut source: EffectSource) -> (u64, Option<EffectSource>) {
        let order = self.next_effect_order();
        source.state.effect_order = order;

        let displaced = match holder {
            Holder::Pokemon(pokemon) => self.pokemon_mut(pokemon).and_then(|p| p.attach(source)),
            Holder::Slot { side, slot } => {
                if let Some(conditions) = self.side_mut(side).slot_conditions.get_mut(slot) {
                    conditions.push(source);
                }
                None
            }
            Holder::Side(side) => {
                self.side_mut(side).side_conditions.push(source);
                None
            }
            Holder::Field => match source.kind {
                EffectKind::Weather => self.field.weather.replace(source),
                EffectKind::Terrain => self.field.terrain.replace(source),
                _ => {
                    self.field.pseudo_weather.push(source);
                    None
                }
            },
            Holder::Format => self.format.replace(source),
            Holder::ActiveMove(_) => match self.active_move.as_mut() {
                Some(active) => active.source.replace(source),
                None => None,
            },
        };
        (order, displaced)
    }

    /// Every attached source with its holder, in collection order: field,
    /// format, active move, then each side's conditions, then each active
    /// creature's own sources.
    pub fn attached_sources(&self) -> Vec<(Holder, &EffectSource)> {
        let mut sources: Vec<(Holder, &EffectSource)> = Vec::new();

        sources.extend(self.field.attached().map(|s| (Holder::Field, s)));
        sources.extend(self.format.iter().map(|s| (Holder::Format, s)));
        if let Some(active) = &self.active_move {
            sources.extend(active.source.iter().map(|s| (Holder::ActiveMove(active.user), s)));
        }

        for side in &self.sides {
            sources.extend(side.side_conditions.iter().map(|s| (Holder::Side(side.id), s)));
            for (slot, conditions) in side.slot_conditions.iter().enumerate() {
                sources.extend(conditions.iter().map(|s| {
                    (
                        Holder::Slot {
                            side: side.id,
                            slot,
                        },
                        s,
                    )
                }));
            }
        }

        for pokemon in self.active_refs() {
            if let Some(inst) = self.pokemon(pokemon) {
                sources.extend(inst.attached().map(|s| (Holder::Pokemon(pokemon), s)));
            }
        }

        sources
    }

    pub fn find_source(&self, holder: Holder, effect_order: u64) -> Option<&EffectSource> {
        let matches = |s: &&EffectSource| s.state.effect_order == effect_order;
        match holder {
            Holder::Pokemon(pokemon) => self.pokemon(pokemon)?.attached().find(matches),
            Holder::Slot { side, slot } => self.side(side).slot_conditions.get(slot)?.iter().find(matches),
            Holder::Side(side) => self.side(side).side_conditions.iter().find(matches),
            Holder::Field => self.field.attached().find(matches),
            Holder::Format => self.format.iter().find(matches),
            Holder::ActiveMove(user) => self
                .active_move
                .as_ref()
                .filter(|active| active.user == user)?
                .source
                .iter()
                .find(matches),
        }
    }

    pub fn find_source_mut(&mut self, holder: Holder, effect_order: u64) -> Option<&mut EffectSource> {
        let matches = |s: &&mut EffectSource| s.state.effect_order == effect_order;
        match holder {
            Holder::Pokemon(pokemon) => self.pokemon_mut(pokemon)?.attached_mut().find(matches),
            Holder::Slot { side, slot } => self
                .side_mut(side)
                .slot_conditions
                .get_mut(slot)?
                .iter_mut()
                .find(matches),
            Holder::Side(side) => self.side_mut(side).side_conditions.iter_mut().find(matches),
            Holder::Field => {
                let field = &mut self.field;
                field
                    .weather
                    .iter_mut()
                    .chain(field.terrain.iter_mut())
                    .chain(field.pseudo_weather.iter_mut())
                    .find(matches)
            }
            Holder::Format => self.format.iter_mut().find(matches),
            Holder::ActiveMove(_) => self
                .active_move
                .as_mut()?
                .source
                .iter_mut()
                .find(matches),
        }
    }

    pub fn detach(&mut self, holder: Holder, effect_order: u64) -> Option<EffectSource> {
        let take_if = |slot: &mut Option<EffectSource>| {
            if slot.as_ref().is_some_and(|s| s.state.effect_order == effect_order) {
                slot.take()
            } else {
                None
            }
        };
        match holder {
            Holder::Pokemon(pokemon) => self.pokemon_mut(pokemon)?.detach(effect_order),
            Holder::Slot { side, slot } => self.side_mut(side).detach_slot_condition(slot, effect_order),
            Holder::Side(side) => self.side_mut(side).detach_side_condition(effect_order),
            Holder::Field => {
                if let Some(weather) = take_if(&mut self.field.weather) {
                    return Some(weather);
                }
                if let Some(terrain) = take_if(&mut self.field.terrain) {
                    return Some(terrain);
                }
                let index = self
                    .field
                    .pseudo_weather
                    .iter()
                    .position(|s| s.state.effect_order == effect_order)?;
                Some(self.field.pseudo_weather.remove(index))
            }
            Holder::Format => take_if(&mut self.format),
            Holder::ActiveMove(_) => take_if(&mut self.active_move.as_mut()?.source),
        }
    }

    /// Ability and item handlers are skipped while the holder's flag is set.
    pub fn is_suppressed(&self, holder: Holder, kind: EffectKind) -> bool {
        let Holder::Pokemon(pokemon) = holder else {
            return false;
        };
        match (kind, self.pokemon(pokemon)) {
            (EffectKind::Ability, Some(p)) => p.ability_suppressed,
            (EffectKind::Item, Some(p)) => p.item_suppressed,
            _ => false,
        }
    }

    // --- Log ---

    /// Appends to the turn log, failing once the configured limit is hit.
    pub fn log_event(&mut self, event: BattleEvent) -> DispatchResult<()> {
        if self.log.len() >= self.config.max_log_events_per_turn {
            return Err(DispatchError::LogLimitExceeded {
                limit: self.config.max_log_events_per_turn,
            });
        }
        self.log.push(event);
        Ok(())
    }

    /// Takes everything logged since the last drain.
    pub fn drain_log(&mut self) -> EventBus {
        std::mem::take(&mut self.log)
    }

    /// The winner once a side is out of creatures. Both out is a draw.
    pub fn check_battle_end(&self) -> Option<GameState> {
        match (self.sides[0].is_defeated(), self.sides[1].is_defeated()) {
            (true, true) => Some(GameState::Draw),
            (true, false) => Some(GameState::Won(SideId::P2)),
            (false, true) => Some(GameState::Won(SideId::P1)),
            (false, false) => None,
        }
    }
}

/// Adjacency on a field of `slots` positions per side: neighbours on the
/// same side, and the facing positions (plus their neighbours) across.
pub fn slots_adjacent(side_a: SideId, slot_a: usize, side_b: SideId, slot_b: usize, slots: usize) -> bool {
    if side_a == side_b {
        slot_a.abs_diff(slot_b) == 1
    } else {
        // Foe slots are numbered from the other end.
        let mirrored = slots as isize - 1 - slot_b as isize;
        (slot_a as isize - mirrored).abs() <= 1
    }
}

#[cfg(test)]
mod event_formatting_tests {
    use super::*;
    use crate::battle::tests::common::{create_test_battle, TestPokemonBuilder};
    use pretty_assertions::assert_eq;

    fn battle() -> BattleState {
        create_test_battle(
            vec![TestPokemonBuilder::new("Pikachu").build()],
            vec![TestPokemonBuilder::new("Charmander").build()],
        )
    }

    #[test]
    fn test_move_and_damage_formatting() {
        let state = battle();
        let pikachu = PokemonRef::new(SideId::P1, 0);
        let charmander = PokemonRef::new(SideId::P2, 0);

        let used = BattleEvent::MoveUsed {
            pokemon: pikachu,
            move_used: MoveId::from("tackle"),
        };
        assert_eq!(used.format(&state), Some("Pikachu used Tackle!".to_string()));

        let damage = BattleEvent::DamageDealt {
            target: charmander,
            damage: 12,
            remaining_hp: 88,
        };
        assert_eq!(damage.format(&state), Some("Charmander took 12 damage!".to_string()));
        assert_eq!(BattleEvent::TurnEnded.format(&state), None);
    }

    #[test]
    fn test_bus_replay_round_trip_keeps_order() {
        let mut bus = EventBus::new();
        bus.push(BattleEvent::TurnStarted { turn_number: 3 });
        bus.push(BattleEvent::PokemonFainted {
            pokemon: PokemonRef::new(SideId::P2, 1),
        });
        bus.push(BattleEvent::BattleEnded {
            winner: Some(SideId::P1),
        });

        let bytes = bus.to_replay_bytes().unwrap();
        let restored = EventBus::from_replay_bytes(&bytes).unwrap();
        assert_eq!(restored, bus);
        assert!(bus.to_json().unwrap().contains("PokemonFainted"));
    }

    #[test]
    fn test_log_limit() {
        let mut state = battle();
        state.config.max_log_events_per_turn = 1;
        state.drain_log();
        state.log_event(BattleEvent::TurnEnded).unwrap();
        assert_eq!(
            state.log_event(BattleEvent::TurnEnded),
            Err(DispatchError::LogLimitExceeded { limit: 1 })
        );
    }

    #[test]
    fn test_doubles_adjacency() {
        // In doubles every foe is adjacent; an ally only to its neighbour.
        assert!(slots_adjacent(SideId::P1, 0, SideId::P2, 0, 2));
        assert!(slots_adjacent(SideId::P1, 0, SideId::P2, 1, 2));
        assert!(slots_adjacent(SideId::P1, 0, SideId::P1, 1, 2));
        assert!(!slots_adjacent(SideId::P1, 0, SideId::P1, 0, 2));
        // Triples: the far corner is out of reach.
        assert!(!slots_adjacent(SideId::P1, 0, SideId::P2, 0, 3));
        assert!(slots_adjacent(SideId::P1, 1, SideId::P2, 0, 3));
    }

    #[test]
    fn test_scripted_rng_then_seeded() {
        let mut rng = TurnRng::new_for_test(vec![7, 99]);
        assert_eq!(rng.next_outcome("first"), 7);
        assert_eq!(rng.next_outcome("second"), 99);
        let roll = rng.next_outcome("fallback");
        assert!((1..=100).contains(&roll));
    }

    #[test]
    fn test_pick_tolerates_a_zero_roll() {
        let mut rng = TurnRng::new_for_test(vec![0, 1, 100]);
        assert_eq!(rng.pick(3, "zero"), 0);
        assert_eq!(rng.pick(3, "low"), 0);
        assert_eq!(rng.pick(3, "high"), 0);
    }
}
