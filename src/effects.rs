//! Effect sources: attachable capabilities that own handler descriptors.
//!
//! The catalog of concrete abilities, items, conditions and moves lives
//! outside the core. It is consulted through [`EffectCatalog`] whenever an
//! effect is attached.

use crate::errors::BattleStateError;
use crate::events::HandlerTable;
use crate::pokemon::PokemonRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strum::Display;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EffectId(String);

impl EffectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EffectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EffectKind {
    Ability,
    Item,
    Status,
    Volatile,
    SlotCondition,
    SideCondition,
    Weather,
    Terrain,
    PseudoWeather,
    ActiveMove,
    Format,
}

impl EffectKind {
    /// Tie-break rank used when a descriptor sets no sub-order. Lower runs
    /// first.
    pub fn default_sub_order(self) -> i32 {
        match self {
            EffectKind::ActiveMove => 0,
            EffectKind::Status | EffectKind::Volatile => 2,
            EffectKind::SlotCondition => 3,
            EffectKind::SideCondition => 4,
            EffectKind::Weather
            | EffectKind::Terrain
            | EffectKind::PseudoWeather
            | EffectKind::Format => 5,
            EffectKind::Ability => 7,
            EffectKind::Item => 8,
        }
    }
}

/// Per-attachment bookkeeping.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectState {
    /// Turns left; ticked by the residual pass. `None` lasts until removed.
    pub duration: Option<u8>,
    /// Free counter for effects that track something (toxic stages, sleep
    /// turns).
    pub counter: i32,
    /// Registration sequence, assigned on attach. Unique for the battle.
    pub effect_order: u64,
    pub source: Option<PokemonRef>,
}

/// One attached effect.
#[derive(Debug, Clone)]
pub struct EffectSource {
    pub id: EffectId,
    pub kind: EffectKind,
    pub handlers: Arc<HandlerTable>,
    pub state: EffectState,
}

impl EffectSource {
    pub fn new(id: EffectId, kind: EffectKind, handlers: Arc<HandlerTable>) -> Self {
        Self {
            id,
            kind,
            handlers,
            state: EffectState::default(),
        }
    }

    pub fn with_duration(mut self, turns: u8) -> Self {
        self.state.duration = Some(turns);
        self
    }
}

/// Lookup of handler tables by effect id.
pub trait EffectCatalog: Send + Sync {
    fn handlers(&self, id: &EffectId) -> Option<Arc<HandlerTable>>;

    /// Builds an unattached source for `id`.
    fn instantiate(&self, id: &EffectId, kind: EffectKind) -> Result<EffectSource, BattleStateError> {
        self.handlers(id)
            .map(|handlers| EffectSource::new(id.clone(), kind, handlers))
            .ok_or_else(|| BattleStateError::UnknownEffect(id.clone()))
    }
}

/// The in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    tables: HashMap<EffectId, Arc<HandlerTable>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler table for `id`.
    pub fn register(&mut self, id: impl Into<EffectId>, table: HandlerTable) -> &mut Self {
        self.tables.insert(id.into(), Arc::new(table));
        self
    }

    pub fn contains(&self, id: &EffectId) -> bool {
        self.tables.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl EffectCatalog for EffectRegistry {
    fn handlers(&self, id: &EffectId) -> Option<Arc<HandlerTable>> {
        self.tables.get(id).cloned()
    }
}
