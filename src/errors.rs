use crate::battle::state::GameState;
use crate::effects::EffectId;
use crate::events::{EventKind, RelayKind, RelayKinds, Scope, TargetShape};
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use schema::{GameType, MoveTarget, SideId};
use thiserror::Error;

/// Main error type for the battle engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleEngineError {
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("Choice rejected: {0}")]
    Choice(#[from] ChoiceError),
    #[error("Dispatch aborted: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Battle state error: {0}")]
    BattleState(#[from] BattleStateError),
    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// A handler descriptor whose callback disagrees with its event kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("{kind} carries {expected:?} but the handler reads {declared}")]
    RelayParameterMismatch {
        kind: EventKind,
        expected: Option<RelayKind>,
        declared: RelayKind,
    },
    #[error("{kind} targets a {expected:?} but the handler expects a {declared:?}")]
    TargetMismatch {
        kind: EventKind,
        expected: TargetShape,
        declared: TargetShape,
    },
    #[error("{kind} never yields {undeclared:?}")]
    ReturnMismatch {
        kind: EventKind,
        undeclared: RelayKinds,
    },
    #[error("a handler for {kind} with scope {scope:?} is already registered")]
    DuplicateHandler { kind: EventKind, scope: Scope },
}

/// A rejected player choice. Each variant names the violated board rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    #[error("no creature at {0}")]
    UnknownCreature(PokemonRef),
    #[error("{attacker} does not know {move_id}")]
    UnknownMove { attacker: PokemonRef, move_id: MoveId },
    #[error("{attacker} has no PP left for {move_id}")]
    NoPpLeft { attacker: PokemonRef, move_id: MoveId },
    #[error("{move_id} is disabled for {attacker}")]
    MoveDisabled { attacker: PokemonRef, move_id: MoveId },
    #[error("{0} has fainted and cannot act")]
    AttackerFainted(PokemonRef),
    #[error("{0} is not on the field")]
    AttackerNotActive(PokemonRef),
    #[error("{0} cannot terastallize")]
    TerastallizeUnavailable(PokemonRef),
    #[error("normal-target move requires exactly one chosen target")]
    MissingNormalTarget,
    #[error("{0} moves do not take a chosen target")]
    UnexpectedNormalTarget(MoveTarget),
    #[error("chosen target does not match {0}")]
    NormalTargetMismatch(PokemonRef),
    #[error("{0} appears twice in the target list")]
    DuplicateTarget(PokemonRef),
    #[error("{0} has fainted and cannot be targeted")]
    FaintedTarget(PokemonRef),
    #[error("{0} is not on the field and cannot be targeted")]
    TargetNotActive(PokemonRef),
    #[error("{category} moves take {min}..={max} targets, got {found}")]
    TargetCount {
        category: MoveTarget,
        min: usize,
        max: usize,
        found: usize,
    },
    #[error("{target} is not a legal target for a {category} move: {reason}")]
    IllegalTarget {
        category: MoveTarget,
        target: PokemonRef,
        reason: &'static str,
    },
    #[error("cannot switch {0} into itself")]
    SwitchIntoSelf(PokemonRef),
    #[error("cannot switch {out} out for {into} from the other side")]
    CrossSideSwitch { out: PokemonRef, into: PokemonRef },
    #[error("{0} is not in an active slot")]
    SwitchOutNotActive(PokemonRef),
    #[error("{0} is already active")]
    SwitchInAlreadyActive(PokemonRef),
    #[error("cannot switch a fainted creature in: {0}")]
    SwitchInFainted(PokemonRef),
    #[error("team preview needs exactly {expected} creatures, got {found}")]
    TeamSizeMismatch { expected: usize, found: usize },
    #[error("team preview members must all come from one side")]
    MixedSides,
    #[error("{0} is not part of the roster")]
    NotInRoster(PokemonRef),
    #[error("{0} is listed twice in team preview")]
    DuplicateInPreview(PokemonRef),
    #[error("{0} has fainted and cannot be brought")]
    FaintedInPreview(PokemonRef),
    #[error("dual-slot choices need a multi-active format, this is {0}")]
    NotMultiActive(GameType),
    #[error("slot choice belongs to {found}, expected {expected}")]
    SlotSideMismatch { expected: SideId, found: SideId },
    #[error("slot {expected} choice was made by the creature in slot {found}")]
    SlotOrder { expected: usize, found: usize },
    #[error("{0} cannot move twice in one turn")]
    DuplicateMover(PokemonRef),
    #[error("{0} cannot be switched out twice")]
    DoubleSwitchOut(PokemonRef),
    #[error("{0} cannot be switched in twice")]
    DoubleSwitchIn(PokemonRef),
    #[error("{0} cannot be switched out and in at once")]
    SwitchOutAndIn(PokemonRef),
    #[error("{0} cannot move and switch in the same turn")]
    MoverSwitched(PokemonRef),
    #[error("choice does not answer a {expected} request")]
    WrongRequest { expected: &'static str },
}

/// Engine-invariant violations found while an event is firing. These abort
/// the turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{effect} returned {returned} from {kind}, which never yields it")]
    UndeclaredRelay {
        kind: EventKind,
        effect: EffectId,
        returned: RelayKind,
    },
    #[error("{kind} carries {expected:?}, got {found}")]
    RelayTypeMismatch {
        kind: EventKind,
        expected: Option<RelayKind>,
        found: RelayKind,
    },
    #[error("{kind} fired at a {found:?}, expected a {expected:?}")]
    TargetShapeMismatch {
        kind: EventKind,
        expected: TargetShape,
        found: TargetShape,
    },
    #[error("{holder} left the field while {kind} was firing")]
    HolderLeftField { kind: EventKind, holder: PokemonRef },
    #[error("{kind} nested {depth} events deep")]
    DepthExceeded { kind: EventKind, depth: usize },
    #[error("turn produced more than {limit} log events")]
    LogLimitExceeded { limit: usize },
    #[error("no creature at {0}")]
    UnknownCreature(PokemonRef),
    #[error("effect {0} is not in the catalog")]
    UnknownEffect(EffectId),
}

/// Errors related to battle state validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleStateError {
    #[error("No active Pokemon for {0}")]
    NoActivePokemon(SideId),
    #[error("Invalid Pokemon reference: {0}")]
    InvalidPokemonRef(PokemonRef),
    #[error("Invalid slot {slot} for {side}")]
    InvalidSlot { side: SideId, slot: usize },
    #[error("Effect not found: {0}")]
    UnknownEffect(EffectId),
    #[error("Move not found: {0}")]
    UnknownMove(MoveId),
    #[error("Battle is not accepting that in state {0:?}")]
    WrongGameState(GameState),
    #[error("{0} has not submitted a choice")]
    MissingChoice(SideId),
    #[error("Roster for {side} has {found} creatures, format needs {needed}")]
    RosterTooSmall {
        side: SideId,
        needed: usize,
        found: usize,
    },
    #[error("Malformed move data: {0}")]
    MalformedMoveData(String),
}

/// Failures at the decision boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("request for {0} was cancelled")]
    Cancelled(SideId),
    #[error("{side} did not answer within {after_ms}ms")]
    TimedOut { side: SideId, after_ms: u64 },
    #[error("decision source for {side} failed: {reason}")]
    SourceFailed { side: SideId, reason: String },
    #[error("{side} gave up after {attempts} rejected choices")]
    TooManyRejections { side: SideId, attempts: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("could not parse engine config: {0}")]
    Parse(String),
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

/// Type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Type alias for Results produced while an event is firing
pub type DispatchResult<T> = Result<T, DispatchError>;

pub type ChoiceResult<T> = Result<T, ChoiceError>;

pub type DescriptorResult<T> = Result<T, DescriptorError>;
