// Battle Core Schema - Shared type definitions
// Plain board enums shared between the battle core and its collaborators
// (decision sources, effect catalogs, presentation).

pub use battle_data::*;
pub use pokemon_types::*;

pub mod battle_data;
pub mod pokemon_types;
