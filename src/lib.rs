//! Pokemon Battle Core
//!
//! An effect/event dispatch engine for creature battles. Abilities, items,
//! statuses, side conditions, weather and moves all plug into one event
//! bus as handler tables, and the engine resolves turns by firing events
//! through them in a fixed, speed-aware order. Player input arrives as
//! validated choices through an async decision boundary.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod choices;
pub mod config;
pub mod decision;
pub mod effects;
pub mod errors;
pub mod events;
pub mod logging;
pub mod moves;
pub mod pokemon;
pub mod prefab_effects;
pub mod prefab_teams;
pub mod side;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{GameType, MoveCategory, MoveTarget, PokemonType, SideId, StatType};

// Core battle engine functions and state.
pub use battle::engine::{advance, forfeit, ready_for_turn_resolution, resolve_turn, start_battle, submit_choice};
pub use battle::state::{BattleEvent, BattleState, EventBus, GameState};

// Player input.
pub use choices::{Choice, DualSlotChoice, MoveChoice, NormalTarget, SlotChoice, SwitchChoice, TeamPreviewChoice};
pub use decision::{build_request, build_requests, BattleRunner, CancelHandle, DecisionSource, Request};

// Effects and the event bus.
pub use effects::{EffectCatalog, EffectId, EffectKind, EffectRegistry, EffectSource};
pub use events::{Callback, EventKind, HandlerDescriptor, HandlerTable, Holder, RelayValue, Scope};

// Runtime data.
pub use config::EngineConfig;
pub use moves::{MoveData, MoveId, MoveLibrary};
pub use pokemon::{PokemonInst, PokemonRef};
pub use side::Side;

// Crate-specific error and result types.
pub use errors::{BattleEngineError, BattleResult, BattleStateError, ChoiceError, DecisionError, DispatchError};
